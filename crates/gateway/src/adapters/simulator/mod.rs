//! Simulated brokerage
//!
//! Behaves like a live account from the adapter's point of view: it assigns
//! ids, pushes order updates through the registered callback, keeps ledger
//! postings, positions, cash and candles, and serves market-data streams.
//! Order progress (working, fills, rejections) is driven explicitly by the
//! test hooks, and failures can be injected per call.

mod brokerage;
mod streams;

pub use brokerage::SimulatedBrokerage;
