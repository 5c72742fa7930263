//! Bootstrap - wiring a brokerage session
//!
//! Builds every collaborator the adapter needs from a [`RunnerConfig`]:
//! - the simulated brokerage (transport and market-data streams)
//! - the static symbol table from the configured mappings
//! - a channel sink standing in for the engine
//! - the system clock

use conduit_brokerage::{Brokerage, BrokerageDeps, ChannelSink, EngineEvent};
use conduit_clock::SystemClock;
use conduit_gateway::{SimulatedBrokerage, StaticSymbolMapper};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{ConfigError, RunnerConfig, load_default_config};

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Brokerage error: {0}")]
    Brokerage(#[from] conduit_brokerage::Error),
}

/// A wired, not yet connected, brokerage session
pub struct SessionBootstrap {
    pub config: RunnerConfig,
    pub brokerage: Arc<Brokerage>,
    /// Test/dry-run handle on the simulated account
    pub simulator: SimulatedBrokerage,
    /// Everything the adapter reports to the engine
    pub events: UnboundedReceiver<EngineEvent>,
}

impl SessionBootstrap {
    /// Bootstrap with the embedded default configuration
    pub fn new() -> Result<Self, BootstrapError> {
        Self::with_config(load_default_config()?)
    }

    /// Must be called inside a tokio runtime
    pub fn with_config(config: RunnerConfig) -> Result<Self, BootstrapError> {
        config.validate()?;

        let simulator = SimulatedBrokerage::new();
        let (sink, events) = ChannelSink::new();
        let sink = Arc::new(sink);

        let deps = BrokerageDeps {
            transport: Arc::new(simulator.clone()),
            streams: Arc::new(simulator.clone()),
            symbols: Arc::new(StaticSymbolMapper::new(config.symbol_pairs())),
            events: sink.clone(),
            market_data: sink,
            clock: Arc::new(SystemClock::new()),
        };
        let brokerage = Brokerage::new(deps, config.brokerage.clone())?;

        log::info!(
            "Bootstrapped session over {} symbols ({} account)",
            config.symbols.len(),
            config.brokerage.account_currency
        );

        Ok(Self {
            config,
            brokerage: Arc::new(brokerage),
            simulator,
            events,
        })
    }

    /// Configured local symbols, in file order
    pub fn symbols(&self) -> Vec<String> {
        self.config.symbols.iter().map(|m| m.symbol.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_from_default_config() {
        let bootstrap = SessionBootstrap::new().unwrap();

        assert_eq!(bootstrap.symbols(), vec!["AAPL", "MSFT", "SPY"]);
        assert!(!bootstrap.brokerage.is_connected());
        assert_eq!(bootstrap.simulator.order_count(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let mut config = load_default_config().unwrap();
        config.symbols.clear();

        assert!(matches!(
            SessionBootstrap::with_config(config),
            Err(BootstrapError::Config(ConfigError::NoSymbols))
        ));
    }
}
