//! Conduit Brokerage
//!
//! Keeps the engine's view of its brokerage orders consistent with the
//! brokerage's asynchronous order-update feed while engine calls mutate the
//! same state. Responsible for:
//! - **Order Table**: brokerage id → engine order, the only ownership registry
//! - **Serialized Mutator**: one-at-a-time execution of every mutating call
//!   sequence and every reconciliation step
//! - **Reconciliation**: one domain event per meaningful transition, fees
//!   attached to fills, terminal ids dropped
//! - **Subscriptions**: per-ticker quote/trade streams routed to local symbols
//!
//! ## Architecture
//!
//! ```text
//! Engine ──► place / modify / cancel ──► ┌──────────────────────────────────┐
//!                                        │            Brokerage             │
//!                                        │  ┌────────────────────────────┐  │
//!                                        │  │ SerializedMutator          │  │
//!                                        │  │  - order entry units       │  │
//!                                        │  │  - reconciliation units    │  │
//!                                        │  └─────────────┬──────────────┘  │
//!                                        │                │                 │
//!                                        │  ┌─────────────▼──────────────┐  │
//!                                        │  │ OrderTable                 │  │
//!                                        │  └────────────────────────────┘  │
//!                                        └──────┬──────────────────▲────────┘
//!                                               │ RPC              │ push
//!                                               ▼                  │
//!                                        BrokerageTransport ───────┘
//!
//! Reconciler ──► OrderEvent / BrokerageMessage ──► OrderEventSink (engine)
//! SubscriptionRegistry ──► Tick ──► MarketDataSink (engine)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conduit_brokerage::{Brokerage, BrokerageConfig, BrokerageDeps};
//!
//! let brokerage = Brokerage::new(deps, BrokerageConfig::default())?;
//! brokerage.connect().await?;
//!
//! let order = OrderRef::new(LocalOrder::limit("AAPL", dec!(10), dec!(100)));
//! if brokerage.place(&order).await? {
//!     // Submitted event already emitted; fills arrive through the sink
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod fees;
pub mod guard;
pub mod mutator;
pub mod order_table;
pub mod reconciliation;
pub mod sink;
pub mod subscriptions;

// Re-export main types
pub use adapter::{Brokerage, BrokerageDeps};
pub use config::{BrokerageConfig, HistoryChunking};
pub use error::{Error, Result};
pub use fees::FeeResolver;
pub use guard::RpcGuard;
pub use mutator::{MutatorHandle, MutatorStats, SerializedMutator};
pub use order_table::{OrderTable, TrackedOrder};
pub use reconciliation::{Outcome, Reconciler};
pub use sink::{ChannelSink, EngineEvent};
pub use subscriptions::{SubscriptionEntry, SubscriptionRegistry, TickRouter};
