use conduit_core::Symbol;

use crate::SymbolResult;

/// Port for translating between engine symbols and brokerage tickers.
///
/// Lookups never fall back to the input string: an instrument the mapper does
/// not know is an error.
pub trait SymbolMapper: Send + Sync {
    fn to_broker_ticker(&self, symbol: &str) -> SymbolResult<String>;

    fn to_local(&self, ticker: &str) -> SymbolResult<Symbol>;
}
