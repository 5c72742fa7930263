//! Conduit Core Domain
//!
//! Pure domain types for the Conduit brokerage adapter: the engine-owned order
//! aggregate, its lifecycle status, the domain events emitted back to the
//! engine, and the account/market-data values the adapter hands out.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Account
    CashAmount,
    Holding,
    // Market data
    Bar,
    HistoryRequest,
    QuoteTick,
    Resolution,
    Tick,
    TradeTick,
    // Notifications
    BrokerageMessage,
    MessageKind,
    // Orders
    LocalOrder,
    OrderEvent,
    OrderFee,
    OrderId,
    OrderRef,
    OrderStatus,
    OrderType,
    OrderValidationError,
    Side,
    TimeInForce,
};
pub use values::{Price, Quantity, Symbol, Timestamp};
