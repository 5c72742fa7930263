use serde::{Deserialize, Serialize};

/// Order kinds the engine can submit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at current market price
    Market,
    /// Execute at specified price or better
    Limit,
    /// Market order triggered when price reaches stop price
    StopMarket,
    /// Limit order triggered when price reaches stop price
    StopLimit,
}

impl OrderType {
    pub fn requires_limit_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderType::StopMarket | OrderType::StopLimit)
    }
}
