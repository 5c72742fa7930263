use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderValidationError;
use crate::values::{Price, Quantity, Symbol, Timestamp};

/// Top-of-book quote update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTick {
    pub symbol: Symbol,
    pub time: Timestamp,
    pub bid_price: Price,
    pub bid_size: Quantity,
    pub ask_price: Price,
    pub ask_size: Quantity,
}

impl QuoteTick {
    pub fn mid_price(&self) -> Price {
        (self.bid_price + self.ask_price) / Price::TWO
    }
}

/// Last trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    pub symbol: Symbol,
    pub time: Timestamp,
    pub price: Price,
    pub size: Quantity,
}

/// Market data delivered to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tick {
    Quote(QuoteTick),
    Trade(TradeTick),
}

impl Tick {
    pub fn symbol(&self) -> &str {
        match self {
            Tick::Quote(q) => &q.symbol,
            Tick::Trade(t) => &t.symbol,
        }
    }

    pub fn time(&self) -> Timestamp {
        match self {
            Tick::Quote(q) => q.time,
            Tick::Trade(t) => t.time,
        }
    }
}

/// Bar size of a history request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Tick,
    Second,
    Minute,
    Hour,
    Daily,
}

impl Resolution {
    /// Length of one bar; ticks have no fixed span
    pub fn bar_span(&self) -> Option<Duration> {
        match self {
            Resolution::Tick => None,
            Resolution::Second => Some(Duration::seconds(1)),
            Resolution::Minute => Some(Duration::minutes(1)),
            Resolution::Hour => Some(Duration::hours(1)),
            Resolution::Daily => Some(Duration::days(1)),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::Tick => "tick",
            Resolution::Second => "second",
            Resolution::Minute => "minute",
            Resolution::Hour => "hour",
            Resolution::Daily => "daily",
        };
        f.write_str(name)
    }
}

/// OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: Symbol,
    /// Bar open time
    pub time: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
}

/// Historical data request, end exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub resolution: Resolution,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl HistoryRequest {
    pub fn new(
        symbol: impl Into<Symbol>,
        resolution: Resolution,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            resolution,
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.start >= self.end {
            return Err(OrderValidationError::InvalidHistoryWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, time: Timestamp) -> bool {
        time >= self.start && time < self.end
    }
}
