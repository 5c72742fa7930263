use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LocalOrder, OrderId, OrderStatus};
use crate::values::{Price, Quantity, Timestamp};

/// Fee charged by the brokerage for an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFee {
    pub amount: Decimal,
    pub currency: String,
}

impl OrderFee {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Domain event describing an order status change, fill, or fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    /// Brokerage id the event was reported for (absent for local failures)
    pub broker_id: Option<String>,
    /// Order state after the transition was applied
    pub order: LocalOrder,
    pub status: OrderStatus,
    pub timestamp: Timestamp,
    pub fee: OrderFee,
    /// Signed fill quantity, only present on the transition to `Filled`
    pub fill_quantity: Option<Quantity>,
    pub fill_price: Option<Price>,
    pub message: Option<String>,
}

impl OrderEvent {
    pub fn new(
        order: LocalOrder,
        broker_id: Option<String>,
        status: OrderStatus,
        timestamp: Timestamp,
        fee: OrderFee,
    ) -> Self {
        Self {
            order_id: order.id,
            broker_id,
            order,
            status,
            timestamp,
            fee,
            fill_quantity: None,
            fill_price: None,
            message: None,
        }
    }

    pub fn with_fill(mut self, quantity: Quantity, price: Option<Price>) -> Self {
        self.fill_quantity = Some(quantity);
        self.fill_price = price;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fill_only_attached_explicitly() {
        let order = LocalOrder::limit("AAPL", dec!(10), dec!(100));
        let event = OrderEvent::new(
            order.clone(),
            Some("B-1".to_string()),
            OrderStatus::PartiallyFilled,
            Utc::now(),
            OrderFee::zero("USD"),
        );
        assert!(event.fill_quantity.is_none());
        assert!(!event.is_terminal());

        let filled = OrderEvent::new(
            order,
            Some("B-1".to_string()),
            OrderStatus::Filled,
            Utc::now(),
            OrderFee::new(dec!(1.25), "USD"),
        )
        .with_fill(dec!(10), Some(dec!(99.5)));
        assert_eq!(filled.fill_quantity, Some(dec!(10)));
        assert!(filled.is_terminal());
        assert!(!filled.fee.is_zero());
    }
}
