//! Brokerage adapter errors

use conduit_core::OrderValidationError;
use conduit_gateway::{ClassificationError, TransportError};
use conduit_ports::SymbolError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid order: {0}")]
    Validation(#[from] OrderValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Unrecognised brokerage code: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Symbol mapping failed: {0}")]
    Symbol(#[from] SymbolError),

    #[error("Brokerage is not connected")]
    NotConnected,

    #[error("Serialized mutator has shut down")]
    MutatorClosed,

    #[error("Serialized unit aborted before completing")]
    UnitAborted,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
