//! Static symbol table

use conduit_core::Symbol;
use conduit_ports::{SymbolError, SymbolMapper, SymbolResult};
use std::collections::HashMap;

/// Fixed bidirectional symbol ↔ ticker table, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticSymbolMapper {
    to_ticker: HashMap<Symbol, String>,
    to_symbol: HashMap<String, Symbol>,
}

impl StaticSymbolMapper {
    pub fn new<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<Symbol>,
        T: Into<String>,
    {
        let mut mapper = Self::default();
        for (symbol, ticker) in pairs {
            mapper.insert(symbol, ticker);
        }
        mapper
    }

    /// Add a mapping; re-mapping a symbol drops its previous ticker
    pub fn insert(&mut self, symbol: impl Into<Symbol>, ticker: impl Into<String>) {
        let symbol = symbol.into();
        let ticker = ticker.into();
        if let Some(previous) = self.to_ticker.insert(symbol.clone(), ticker.clone()) {
            self.to_symbol.remove(&previous);
        }
        self.to_symbol.insert(ticker, symbol);
    }

    pub fn len(&self) -> usize {
        self.to_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_ticker.is_empty()
    }
}

impl SymbolMapper for StaticSymbolMapper {
    fn to_broker_ticker(&self, symbol: &str) -> SymbolResult<String> {
        self.to_ticker
            .get(symbol)
            .cloned()
            .ok_or_else(|| SymbolError::UnknownSymbol(symbol.to_string()))
    }

    fn to_local(&self, ticker: &str) -> SymbolResult<Symbol> {
        self.to_symbol
            .get(ticker)
            .cloned()
            .ok_or_else(|| SymbolError::UnknownTicker(ticker.to_string()))
    }
}
