use conduit_brokerage::BrokerageConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level runner configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Default log filter; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub brokerage: BrokerageConfig,
    /// Local symbol ↔ brokerage ticker table
    pub symbols: Vec<SymbolMapping>,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMapping {
    pub symbol: String,
    pub ticker: String,
}

/// Parameters of the scripted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Signed quantity of the limit order placed per symbol
    pub quantity: Decimal,
    pub limit_price: Decimal,
    /// Commission the simulated brokerage posts for each fill
    pub commission: Decimal,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quantity: Decimal::TEN,
            limit_price: Decimal::ONE_HUNDRED,
            commission: Decimal::ONE,
        }
    }
}
