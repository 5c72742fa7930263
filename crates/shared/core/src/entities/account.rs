use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, Symbol};

/// Position held at the brokerage, priced in the account currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    /// Signed position size: negative for short positions
    pub quantity: Quantity,
    pub average_price: Price,
    pub market_price: Price,
    pub currency: String,
}

impl Holding {
    pub fn new(
        symbol: impl Into<Symbol>,
        quantity: Quantity,
        average_price: Price,
        market_price: Price,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            average_price,
            market_price,
            currency: currency.into(),
        }
    }

    pub fn market_value(&self) -> Decimal {
        self.quantity * self.market_price
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        (self.market_price - self.average_price) * self.quantity
    }

    pub fn is_short(&self) -> bool {
        self.quantity.is_sign_negative()
    }
}

/// Cash balance in a single currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAmount {
    pub currency: String,
    pub amount: Decimal,
}

impl CashAmount {
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_holding_valuation() {
        let holding = Holding::new("AAPL", dec!(10), dec!(100), dec!(110), "USD");
        assert_eq!(holding.market_value(), dec!(1100));
        assert_eq!(holding.unrealized_pnl(), dec!(100));
        assert!(!holding.is_short());
    }

    #[test]
    fn test_short_holding_valuation() {
        let holding = Holding::new("AAPL", dec!(-10), dec!(100), dec!(110), "USD");
        assert_eq!(holding.market_value(), dec!(-1100));
        assert_eq!(holding.unrealized_pnl(), dec!(-100));
        assert!(holding.is_short());
    }
}
