//! Order message types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Order side as sent to the brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerSide {
    Buy,
    Sell,
}

impl BrokerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order type as sent to the brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerOrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl BrokerOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop_limit",
        }
    }
}

/// Time in force as sent to the brokerage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerTimeInForce {
    Day,
    /// Good Till Cancelled
    Gtc,
    /// Immediate Or Cancel
    Ioc,
    /// Fill Or Kill
    Fok,
}

impl BrokerTimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
            Self::Ioc => "ioc",
            Self::Fok => "fok",
        }
    }
}

/// Order placement (or replacement) request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Engine order id, echoed back for correlation
    pub client_order_id: String,
    pub ticker: String,
    pub side: BrokerSide,
    /// Absolute quantity; direction is carried by `side`
    pub quantity: Decimal,
    pub order_type: BrokerOrderType,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: BrokerTimeInForce,
}

impl PlaceOrderRequest {
    /// Create a new limit order request
    pub fn limit(
        client_order_id: impl Into<String>,
        ticker: impl Into<String>,
        side: BrokerSide,
        quantity: Decimal,
        price: Decimal,
        time_in_force: BrokerTimeInForce,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            ticker: ticker.into(),
            side,
            quantity,
            order_type: BrokerOrderType::Limit,
            limit_price: Some(price),
            stop_price: None,
            time_in_force,
        }
    }

    /// Create a new market order request
    pub fn market(
        client_order_id: impl Into<String>,
        ticker: impl Into<String>,
        side: BrokerSide,
        quantity: Decimal,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            ticker: ticker.into(),
            side,
            quantity,
            order_type: BrokerOrderType::Market,
            limit_price: None,
            stop_price: None,
            time_in_force: BrokerTimeInForce::Day,
        }
    }
}

/// Brokerage-side order snapshot
///
/// Returned by placement/replacement calls and by open-order queries. A new
/// `order_id` is issued on every replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrderRecord {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub ticker: String,
    pub side: String,
    /// Absolute quantity
    pub quantity: Decimal,
    pub order_type: String,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: String,
    pub status: String,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl BrokerOrderRecord {
    /// Build the record the brokerage would return for a freshly accepted request
    pub fn accepted(
        order_id: impl Into<String>,
        request: &PlaceOrderRequest,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            client_order_id: Some(request.client_order_id.clone()),
            ticker: request.ticker.clone(),
            side: request.side.as_str().to_string(),
            quantity: request.quantity,
            order_type: request.order_type.as_str().to_string(),
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            time_in_force: request.time_in_force.as_str().to_string(),
            status: status.into(),
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            created_at,
        }
    }
}

/// Pushed order-state notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdateMessage {
    pub order_id: String,
    pub ticker: String,
    pub status: String,
    /// Cumulative filled quantity, absolute
    #[serde(default)]
    pub filled_quantity: Option<Decimal>,
    #[serde(default)]
    pub avg_fill_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl OrderUpdateMessage {
    pub fn new(
        order_id: impl Into<String>,
        ticker: impl Into<String>,
        status: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            ticker: ticker.into(),
            status: status.into(),
            filled_quantity: None,
            avg_fill_price: None,
            timestamp,
        }
    }

    pub fn with_fill(mut self, filled_quantity: Decimal, avg_fill_price: Option<Decimal>) -> Self {
        self.filled_quantity = Some(filled_quantity);
        self.avg_fill_price = avg_fill_price;
        self
    }

    /// Decode a JSON frame from the push stream
    pub fn from_json(frame: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Account ledger posting tied to an order (trade, fee, commission, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub order_id: String,
    pub kind: String,
    pub amount: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Fee-like postings: the brokerage reports both "fee" and "commission"
    pub fn is_fee(&self) -> bool {
        self.kind.eq_ignore_ascii_case("fee") || self.kind.eq_ignore_ascii_case("commission")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_limit_order_request() {
        let request = PlaceOrderRequest::limit(
            "client-1",
            "AAPL.US",
            BrokerSide::Buy,
            dec!(10),
            dec!(100),
            BrokerTimeInForce::Gtc,
        );

        assert_eq!(request.order_type, BrokerOrderType::Limit);
        assert_eq!(request.limit_price, Some(dec!(100)));
        assert!(request.stop_price.is_none());

        let record = BrokerOrderRecord::accepted("B-1", &request, "pending", Utc::now());
        assert_eq!(record.side, "buy");
        assert_eq!(record.order_type, "limit");
        assert_eq!(record.time_in_force, "gtc");
        assert_eq!(record.client_order_id.as_deref(), Some("client-1"));
    }

    #[test]
    fn test_decode_update_frame() {
        let frame = r#"{
            "order_id": "B-7",
            "ticker": "AAPL.US",
            "status": "filled",
            "filled_quantity": "10",
            "avg_fill_price": "99.5",
            "timestamp": "2024-03-01T14:30:00Z"
        }"#;

        let update = OrderUpdateMessage::from_json(frame).unwrap();
        assert_eq!(update.order_id, "B-7");
        assert_eq!(update.status, "filled");
        assert_eq!(update.filled_quantity, Some(dec!(10)));
        assert_eq!(update.avg_fill_price, Some(dec!(99.5)));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result = OrderUpdateMessage::from_json("{not json");
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_fee_postings() {
        let posting = |kind: &str| Transaction {
            order_id: "B-1".to_string(),
            kind: kind.to_string(),
            amount: dec!(-1),
            currency: "USD".to_string(),
            timestamp: Utc::now(),
        };

        assert!(posting("commission").is_fee());
        assert!(posting("FEE").is_fee());
        assert!(!posting("trade").is_fee());
    }
}
