//! Conduit Ports
//!
//! Port definitions (traits) for the Conduit brokerage adapter.
//! These define the boundaries between the reconciliation logic and the
//! engine on one side, and reference data on the other.

mod clock;
mod error;
mod sink;
mod symbols;

pub use clock::Clock;
pub use error::{SymbolError, SymbolResult};
pub use sink::{MarketDataSink, OrderEventSink};
pub use symbols::SymbolMapper;
