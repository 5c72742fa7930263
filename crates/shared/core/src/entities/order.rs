use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::{OrderStatus, OrderType, Side, TimeInForce};
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Reasons an order cannot be sent to the brokerage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("Order quantity must be non-zero")]
    ZeroQuantity,

    #[error("{0:?} order requires a limit price")]
    MissingLimitPrice(OrderType),

    #[error("{0:?} order requires a stop price")]
    MissingStopPrice(OrderType),

    #[error("Price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Order {0} has already been placed")]
    AlreadyPlaced(OrderId),

    #[error("Order {0} has never been placed")]
    NotPlaced(OrderId),

    #[error("Order {0} is {1:?}; only new orders can be placed")]
    NotNew(OrderId, OrderStatus),

    #[error("Unsupported time in force: {0}")]
    UnsupportedTimeInForce(String),

    #[error("Unsupported resolution: {0}")]
    UnsupportedResolution(String),

    #[error("Invalid history window: start {start} is not before end {end}")]
    InvalidHistoryWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Engine-owned order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOrder {
    pub id: OrderId,
    /// Engine symbol of the instrument being traded
    pub symbol: Symbol,
    /// Signed quantity: positive buys, negative sells
    pub quantity: Quantity,
    pub order_type: OrderType,
    /// Required for Limit and StopLimit orders
    pub limit_price: Option<Price>,
    /// Required for StopMarket and StopLimit orders
    pub stop_price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Brokerage ids, one per placement or replacement, oldest first
    pub broker_ids: Vec<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl LocalOrder {
    /// Create a new order with explicit timestamp
    pub fn new_with_time(
        symbol: impl Into<Symbol>,
        quantity: Quantity,
        order_type: OrderType,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
        time_in_force: TimeInForce,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            quantity,
            order_type,
            limit_price,
            stop_price,
            time_in_force,
            broker_ids: Vec::new(),
            status: OrderStatus::New,
            created_at: timestamp,
        }
    }

    /// Create a market order using current system time
    pub fn market(symbol: impl Into<Symbol>, quantity: Quantity) -> Self {
        Self::new_with_time(
            symbol,
            quantity,
            OrderType::Market,
            None,
            None,
            TimeInForce::Day,
            Utc::now(),
        )
    }

    /// Create a good-til-canceled limit order using current system time
    pub fn limit(symbol: impl Into<Symbol>, quantity: Quantity, limit_price: Price) -> Self {
        Self::new_with_time(
            symbol,
            quantity,
            OrderType::Limit,
            Some(limit_price),
            None,
            TimeInForce::GoodTilCanceled,
            Utc::now(),
        )
    }

    /// Create a good-til-canceled stop order using current system time
    pub fn stop_market(symbol: impl Into<Symbol>, quantity: Quantity, stop_price: Price) -> Self {
        Self::new_with_time(
            symbol,
            quantity,
            OrderType::StopMarket,
            None,
            Some(stop_price),
            TimeInForce::GoodTilCanceled,
            Utc::now(),
        )
    }

    /// Create a good-til-canceled stop-limit order using current system time
    pub fn stop_limit(
        symbol: impl Into<Symbol>,
        quantity: Quantity,
        stop_price: Price,
        limit_price: Price,
    ) -> Self {
        Self::new_with_time(
            symbol,
            quantity,
            OrderType::StopLimit,
            Some(limit_price),
            Some(stop_price),
            TimeInForce::GoodTilCanceled,
            Utc::now(),
        )
    }

    pub fn side(&self) -> Side {
        Side::from_signed(self.quantity)
    }

    pub fn abs_quantity(&self) -> Quantity {
        self.quantity.abs()
    }

    /// Most recent brokerage id, if the order has been placed
    pub fn latest_broker_id(&self) -> Option<&str> {
        self.broker_ids.last().map(String::as_str)
    }

    /// An order can be placed once, and only while it is still `New`
    pub fn ensure_placeable(&self) -> Result<(), OrderValidationError> {
        if !self.broker_ids.is_empty() {
            return Err(OrderValidationError::AlreadyPlaced(self.id));
        }
        if self.status != OrderStatus::New {
            return Err(OrderValidationError::NotNew(self.id, self.status));
        }
        Ok(())
    }

    /// Validate price/quantity requirements of the order kind
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.quantity.is_zero() {
            return Err(OrderValidationError::ZeroQuantity);
        }

        if self.order_type.requires_limit_price() {
            match self.limit_price {
                None => return Err(OrderValidationError::MissingLimitPrice(self.order_type)),
                Some(price) if price <= Decimal::ZERO => {
                    return Err(OrderValidationError::NonPositivePrice(price));
                }
                Some(_) => {}
            }
        }

        if self.order_type.requires_stop_price() {
            match self.stop_price {
                None => return Err(OrderValidationError::MissingStopPrice(self.order_type)),
                Some(price) if price <= Decimal::ZERO => {
                    return Err(OrderValidationError::NonPositivePrice(price));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Shared handle to an engine-owned order.
///
/// The engine keeps its own clone; the adapter only updates fields in place in
/// response to confirmed brokerage state. Every update happens under one write
/// lock so readers never see half of a multi-field change.
#[derive(Debug, Clone)]
pub struct OrderRef(Arc<RwLock<LocalOrder>>);

impl OrderRef {
    pub fn new(order: LocalOrder) -> Self {
        Self(Arc::new(RwLock::new(order)))
    }

    pub fn id(&self) -> OrderId {
        self.0.read().id
    }

    pub fn status(&self) -> OrderStatus {
        self.0.read().status
    }

    /// Copy of the current order state
    pub fn snapshot(&self) -> LocalOrder {
        self.0.read().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&LocalOrder) -> R) -> R {
        f(&self.0.read())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut LocalOrder) -> R) -> R {
        f(&mut self.0.write())
    }

    /// True when both handles point at the same order object
    pub fn same_order(&self, other: &OrderRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<LocalOrder> for OrderRef {
    fn from(order: LocalOrder) -> Self {
        Self::new(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_limit_order_requires_price() {
        let mut order = LocalOrder::limit("AAPL", dec!(10), dec!(100));
        assert!(order.validate().is_ok());
        assert_eq!(order.side(), Side::Buy);

        order.limit_price = None;
        assert_eq!(
            order.validate(),
            Err(OrderValidationError::MissingLimitPrice(OrderType::Limit))
        );
    }

    #[test]
    fn test_stop_limit_requires_both_prices() {
        let mut order = LocalOrder::stop_limit("AAPL", dec!(-5), dec!(95), dec!(94));
        assert!(order.validate().is_ok());
        assert_eq!(order.side(), Side::Sell);
        assert_eq!(order.abs_quantity(), dec!(5));

        order.stop_price = None;
        assert_eq!(
            order.validate(),
            Err(OrderValidationError::MissingStopPrice(OrderType::StopLimit))
        );
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let order = LocalOrder::market("AAPL", dec!(0));
        assert_eq!(order.validate(), Err(OrderValidationError::ZeroQuantity));
    }

    #[test]
    fn test_only_new_unplaced_orders_are_placeable() {
        let mut order = LocalOrder::limit("AAPL", dec!(10), dec!(100));
        assert!(order.ensure_placeable().is_ok());

        order.status = OrderStatus::Invalid;
        assert_eq!(
            order.ensure_placeable(),
            Err(OrderValidationError::NotNew(order.id, OrderStatus::Invalid))
        );

        order.broker_ids.push("B-1".to_string());
        assert_eq!(
            order.ensure_placeable(),
            Err(OrderValidationError::AlreadyPlaced(order.id))
        );
    }

    #[test]
    fn test_order_ref_updates_are_shared() {
        let order = OrderRef::new(LocalOrder::market("MSFT", dec!(1)));
        let engine_view = order.clone();

        order.update(|o| {
            o.broker_ids.push("B-1".to_string());
            o.status = OrderStatus::Submitted;
        });

        let seen = engine_view.snapshot();
        assert_eq!(seen.status, OrderStatus::Submitted);
        assert_eq!(seen.latest_broker_id(), Some("B-1"));
        assert!(order.same_order(&engine_view));
    }
}
