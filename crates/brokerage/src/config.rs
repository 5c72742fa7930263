//! Adapter configuration

use conduit_core::Resolution;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Maximum span of a single candle download, per resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryChunking {
    pub minute_days: u32,
    pub hour_days: u32,
    pub daily_days: u32,
}

impl Default for HistoryChunking {
    fn default() -> Self {
        Self {
            minute_days: 5,
            hour_days: 60,
            daily_days: 365,
        }
    }
}

impl HistoryChunking {
    /// Chunk length for `resolution`; `None` for resolutions with no download
    pub fn span(&self, resolution: Resolution) -> Option<chrono::Duration> {
        let days = match resolution {
            Resolution::Minute => self.minute_days,
            Resolution::Hour => self.hour_days,
            Resolution::Daily => self.daily_days,
            Resolution::Tick | Resolution::Second => return None,
        };
        Some(chrono::Duration::days(i64::from(days)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerageConfig {
    /// Currency fees are reported in; postings in other currencies are ignored
    pub account_currency: String,
    /// Wait after a fill before querying fee postings
    pub fee_settlement_delay_ms: u64,
    /// Upper bound on any single brokerage call; `None` waits indefinitely
    pub rpc_timeout_ms: Option<u64>,
    pub history: HistoryChunking,
}

impl Default for BrokerageConfig {
    fn default() -> Self {
        Self {
            account_currency: "USD".to_string(),
            fee_settlement_delay_ms: 1_000,
            rpc_timeout_ms: Some(30_000),
            history: HistoryChunking::default(),
        }
    }
}

impl BrokerageConfig {
    pub fn fee_settlement_delay(&self) -> Duration {
        Duration::from_millis(self.fee_settlement_delay_ms)
    }

    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        let currency = self.account_currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::Config(format!(
                "account_currency must be a 3-letter upper-case code, got {:?}",
                self.account_currency
            )));
        }
        if self.rpc_timeout_ms == Some(0) {
            return Err(Error::Config("rpc_timeout_ms must be positive".to_string()));
        }
        let chunks = &self.history;
        if chunks.minute_days == 0 || chunks.hour_days == 0 || chunks.daily_days == 0 {
            return Err(Error::Config(
                "history chunk spans must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}
