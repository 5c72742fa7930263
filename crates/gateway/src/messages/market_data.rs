//! Market data and account message types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Streamed top-of-book quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteMessage {
    pub ticker: String,
    pub bid_price: Decimal,
    pub bid_size: Decimal,
    pub ask_price: Decimal,
    pub ask_size: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl QuoteMessage {
    pub fn new(
        ticker: impl Into<String>,
        bid: (Decimal, Decimal),
        ask: (Decimal, Decimal),
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            bid_price: bid.0,
            bid_size: bid.1,
            ask_price: ask.0,
            ask_size: ask.1,
            timestamp,
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask_price - self.bid_price
    }
}

/// Streamed trade print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub ticker: String,
    pub price: Decimal,
    pub size: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeMessage {
    /// Create a new trade message
    pub fn new(
        ticker: impl Into<String>,
        price: Decimal,
        size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            size,
            timestamp,
        }
    }

    /// Get the notional value of the trade
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Candle interval codes accepted by the brokerage history endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerInterval {
    Minute,
    Hour,
    Day,
}

impl BrokerInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "1m",
            Self::Hour => "1h",
            Self::Day => "1d",
        }
    }
}

/// One history download window, end exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRequest {
    pub ticker: String,
    pub interval: BrokerInterval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Historical OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerCandle {
    /// Candle open time
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl BrokerCandle {
    /// Flat candle, handy for tests and synthetic fills
    pub fn flat(time: DateTime<Utc>, price: Decimal, volume: Decimal) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }
}

/// Position as reported by the brokerage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub ticker: String,
    /// Signed: negative for short positions
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub market_price: Decimal,
    pub currency: String,
}

/// Cash balance as reported by the brokerage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerCash {
    pub currency: String,
    pub amount: Decimal,
}
