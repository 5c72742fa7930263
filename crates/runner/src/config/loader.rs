use log::LevelFilter;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::types::{RunnerConfig, SymbolMapping};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No symbols configured")]
    NoSymbols,
    #[error("Symbol or ticker mapped twice: {0}")]
    DuplicateMapping(String),
    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid brokerage settings: {0}")]
    Brokerage(#[from] conduit_brokerage::Error),
}

/// Load runner configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RunnerConfig, ConfigError> {
    let default_config = include_str!("runner_config.json");
    load_config_from_str(default_config)
}

impl RunnerConfig {
    /// Symbol/ticker pairs for the symbol mapper
    pub fn symbol_pairs(&self) -> Vec<(String, String)> {
        self.symbols
            .iter()
            .map(|m| (m.symbol.clone(), m.ticker.clone()))
            .collect()
    }

    pub fn get_symbol(&self, symbol: &str) -> Option<&SymbolMapping> {
        self.symbols.iter().find(|m| m.symbol == symbol)
    }

    pub fn log_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }

        let mut symbols = HashSet::new();
        let mut tickers = HashSet::new();
        for mapping in &self.symbols {
            if !symbols.insert(mapping.symbol.as_str()) {
                return Err(ConfigError::DuplicateMapping(mapping.symbol.clone()));
            }
            if !tickers.insert(mapping.ticker.as_str()) {
                return Err(ConfigError::DuplicateMapping(mapping.ticker.clone()));
            }
        }

        self.log_filter()?;
        self.brokerage.validate()?;
        Ok(())
    }
}
