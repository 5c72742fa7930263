//! Error types for the gateway crate

use thiserror::Error;

/// Failures of a brokerage call or of the push path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Brokerage returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Channel closed")]
    ChannelClosed,
}

impl TransportError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP-style status code, when the brokerage answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Auth(_) => Some(401),
            _ => None,
        }
    }

    /// True when the call was abandoned locally rather than refused remotely
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Decode(e.to_string())
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A brokerage code the adapter does not recognise
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Brokerage order status is unspecified")]
    MissingStatus,

    #[error("Unknown brokerage order status: {0:?}")]
    UnknownStatus(String),

    #[error("Unknown brokerage order side: {0:?}")]
    UnknownSide(String),

    #[error("Unknown brokerage order type: {0:?}")]
    UnknownOrderType(String),
}
