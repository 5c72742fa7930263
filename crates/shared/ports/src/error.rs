use thiserror::Error;

/// Symbol mapping failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unknown brokerage ticker: {0}")]
    UnknownTicker(String),
}

pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
