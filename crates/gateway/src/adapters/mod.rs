//! Brokerage adapters
//!
//! Implementations of the transport ports. The simulator runs entirely
//! in-process and is what tests and dry runs connect to.

pub mod simulator;

pub use simulator::SimulatedBrokerage;
