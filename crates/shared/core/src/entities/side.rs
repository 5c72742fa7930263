use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Side implied by a signed quantity (zero is treated as a buy)
    pub fn from_signed(quantity: Decimal) -> Self {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// Apply this side's sign to an absolute quantity
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            Side::Buy => quantity.abs(),
            Side::Sell => -quantity.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_from_signed_quantity() {
        assert_eq!(Side::from_signed(dec!(10)), Side::Buy);
        assert_eq!(Side::from_signed(dec!(-3)), Side::Sell);
        assert_eq!(Side::from_signed(dec!(0)), Side::Buy);
    }

    #[test]
    fn test_signed_quantity() {
        assert_eq!(Side::Sell.signed(dec!(4)), dec!(-4));
        assert_eq!(Side::Buy.signed(dec!(-4)), dec!(4));
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }
}
