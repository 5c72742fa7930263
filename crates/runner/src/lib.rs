//! Conduit Runner - Scripted Brokerage Session
//!
//! Wires the brokerage adapter to the simulated brokerage and drives a full
//! order lifecycle through it:
//!
//! - **Config**: JSON runner configuration with an embedded default
//! - **Logging**: `env_logger` bootstrap honouring `RUST_LOG`
//! - **Bootstrap**: builds the adapter and its collaborators
//! - **Session**: connect, subscribe, place, fill, cancel, refresh, disconnect
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────┐   place/cancel   ┌──────────────────┐
//!   │ Scripted Session │ ───────────────▶ │    Brokerage     │
//!   └────────┬─────────┘                  │     adapter      │
//!            │ work/fill/fees             └───┬──────────▲───┘
//!            ▼                          RPCs  │          │ pushes
//!   ┌──────────────────┐ ◀────────────────────┘          │
//!   │    Simulated     │ ────────────────────────────────┘
//!   │    brokerage     │
//!   └──────────────────┘
//!            engine events ──▶ ChannelSink ──▶ SessionResults
//! ```

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod session;

pub use bootstrap::{BootstrapError, SessionBootstrap};
pub use config::{ConfigError, RunnerConfig, SessionConfig, SymbolMapping};
pub use logging::init_logging;
pub use session::{ScriptedSession, SessionResults};
