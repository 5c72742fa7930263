use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a brokerage notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Information,
    Warning,
    Error,
    Disconnect,
    Reconnect,
}

/// Out-of-band notification for the engine.
///
/// Used for anything that has no caller to return to: reconciliation failures,
/// transport errors on the push path, and lifecycle changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerageMessage {
    pub kind: MessageKind,
    /// Short machine-readable code, e.g. `"PlaceOrderFailed"`
    pub code: String,
    pub message: String,
}

impl BrokerageMessage {
    pub fn new(kind: MessageKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageKind::Information, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, code, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, code, message)
    }
}

impl fmt::Display for BrokerageMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.kind, self.code, self.message)
    }
}
