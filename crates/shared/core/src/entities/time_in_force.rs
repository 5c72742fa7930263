use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time-in-force instructions for order validity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Day order: automatically canceled at end of trading day
    Day,

    /// Good Till Canceled: order remains active until explicitly canceled
    #[default]
    GoodTilCanceled,

    /// Immediate or Cancel: execute immediately (partially or fully) and cancel unfilled portion
    ImmediateOrCancel,

    /// Fill or Kill: execute immediately and completely, or cancel entire order
    FillOrKill,

    /// Good Till Date: order remains active until the specified datetime
    GoodTilDate(DateTime<Utc>),
}

impl TimeInForce {
    /// Check if the order has expired based on current time
    pub fn is_expired(&self, current_time: DateTime<Utc>, day_end: Option<DateTime<Utc>>) -> bool {
        match self {
            TimeInForce::GoodTilDate(expiry) => current_time >= *expiry,
            TimeInForce::Day => day_end.is_some_and(|end| current_time >= end),
            _ => false,
        }
    }

    /// Returns true if partial fills are allowed
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, TimeInForce::FillOrKill)
    }
}
