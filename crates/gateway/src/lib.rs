//! Conduit Gateway
//!
//! Brokerage-facing layer of the Conduit adapter. Provides:
//! - Wire message types for orders, transactions and market data
//! - Exhaustive classification of brokerage codes into domain enums
//! - Transport ports (`BrokerageTransport`, `MarketDataStreams`)
//! - The order-update ingestion channel
//! - An in-process simulated brokerage for tests and dry runs
//!
//! ## Architecture
//!
//! ```text
//!    Brokerage (REST + push, or SimulatedBrokerage)
//!         │                         ▲
//!    push │ OrderUpdateMessage      │ place / replace / cancel / query
//!    ┌────▼──────────┐         ┌────┴─────────────┐
//!    │ IngestionSender│         │ BrokerageTransport│
//!    └────┬──────────┘         └────▲─────────────┘
//!         │ unbounded FIFO          │
//!    ┌────▼────────────┐            │
//!    │ IngestionReceiver├──► reconciliation (conduit-brokerage)
//!    └─────────────────┘
//! ```
//!
//! ## Classification
//!
//! Every status, side and order-type code received from the brokerage goes
//! through [`mapping`]; an unrecognised code is a [`ClassificationError`],
//! never a default.

pub mod adapters;
pub mod error;
pub mod mapping;
pub mod messages;
pub mod symbols;
pub mod transport;

// Re-export commonly used types
pub use adapters::simulator::SimulatedBrokerage;
pub use error::{ClassificationError, TransportError, TransportResult};
pub use mapping::BrokerOrderStatus;
pub use messages::{
    market_data::{
        BrokerCandle, BrokerCash, BrokerInterval, BrokerPosition, CandleRequest, QuoteMessage,
        TradeMessage,
    },
    order::{
        BrokerOrderRecord, BrokerOrderType, BrokerSide, BrokerTimeInForce, OrderUpdateMessage,
        PlaceOrderRequest, Transaction,
    },
};
pub use symbols::StaticSymbolMapper;
pub use transport::{
    BrokerageTransport, MarketDataStreams, OrderUpdateCallback, QuoteCallback, StreamHandle,
    StreamKind, TradeCallback,
    channel::{IngestionReceiver, IngestionSender, IngestionStats, ingestion_channel},
};
