use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision.
/// Order quantities are signed: positive buys, negative sells.
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Engine-side symbol identifier for a tradeable instrument
pub type Symbol = String;
