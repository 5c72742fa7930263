//! Subscription Registry
//!
//! At most one entry per brokerage ticker, each owning a quote stream and a
//! trade stream. Streamed messages are routed by ticker lookup; a miss means
//! the ticker is not (or no longer) subscribed and the message is dropped.
//!
//! A stream whose close keeps failing is parked as an orphan and closed again
//! on every later registry change until the brokerage accepts it.

use conduit_core::{QuoteTick, Symbol, Tick, TradeTick};
use conduit_gateway::{
    MarketDataStreams, QuoteCallback, QuoteMessage, StreamHandle, TradeCallback, TradeMessage,
};
use conduit_ports::{MarketDataSink, SymbolMapper};
use dashmap::DashMap;
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::guard::RpcGuard;

#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    pub symbol: Symbol,
    pub quote: StreamHandle,
    pub trade: StreamHandle,
}

/// Routes streamed messages to the engine, shared by every stream callback
#[derive(Clone)]
pub struct TickRouter {
    entries: Arc<DashMap<String, SubscriptionEntry>>,
    sink: Arc<dyn MarketDataSink>,
}

impl TickRouter {
    fn symbol_for(&self, ticker: &str) -> Option<Symbol> {
        self.entries.get(ticker).map(|entry| entry.symbol.clone())
    }

    /// Returns false if the ticker is not subscribed
    pub fn route_quote(&self, quote: QuoteMessage) -> bool {
        let Some(symbol) = self.symbol_for(&quote.ticker) else {
            trace!("Dropping quote for unsubscribed {}", quote.ticker);
            return false;
        };
        self.sink.on_tick(Tick::Quote(QuoteTick {
            symbol,
            time: quote.timestamp,
            bid_price: quote.bid_price,
            bid_size: quote.bid_size,
            ask_price: quote.ask_price,
            ask_size: quote.ask_size,
        }));
        true
    }

    /// Returns false if the ticker is not subscribed
    pub fn route_trade(&self, trade: TradeMessage) -> bool {
        let Some(symbol) = self.symbol_for(&trade.ticker) else {
            trace!("Dropping trade for unsubscribed {}", trade.ticker);
            return false;
        };
        self.sink.on_tick(Tick::Trade(TradeTick {
            symbol,
            time: trade.timestamp,
            price: trade.price,
            size: trade.size,
        }));
        true
    }
}

pub struct SubscriptionRegistry {
    streams: Arc<dyn MarketDataStreams>,
    symbols: Arc<dyn SymbolMapper>,
    guard: Arc<RpcGuard>,
    router: TickRouter,
    // Serialises subscribe/unsubscribe so a ticker is never opened twice
    changes: Mutex<()>,
    orphans: parking_lot::Mutex<Vec<(String, StreamHandle)>>,
}

impl SubscriptionRegistry {
    pub fn new(
        streams: Arc<dyn MarketDataStreams>,
        symbols: Arc<dyn SymbolMapper>,
        sink: Arc<dyn MarketDataSink>,
        guard: Arc<RpcGuard>,
    ) -> Self {
        Self {
            streams,
            symbols,
            guard,
            router: TickRouter {
                entries: Arc::new(DashMap::new()),
                sink,
            },
            changes: Mutex::new(()),
            orphans: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn router(&self) -> TickRouter {
        self.router.clone()
    }

    /// Open quote and trade streams for `symbol`; no-op if already subscribed.
    ///
    /// Either both streams end up open and registered, or neither does.
    pub async fn subscribe(&self, symbol: &str) -> Result<()> {
        let ticker = self.symbols.to_broker_ticker(symbol)?;
        let _changes = self.changes.lock().await;
        self.close_orphans().await;

        if self.router.entries.contains_key(&ticker) {
            debug!("{} already subscribed", symbol);
            return Ok(());
        }

        let router = self.router.clone();
        let on_quote: QuoteCallback = Arc::new(move |quote| {
            router.route_quote(quote);
        });
        let quote = self
            .guard
            .run("open_quote_stream", self.streams.open_quote_stream(&ticker, on_quote))
            .await?;

        let router = self.router.clone();
        let on_trade: TradeCallback = Arc::new(move |trade| {
            router.route_trade(trade);
        });
        let trade = match self
            .guard
            .run("open_trade_stream", self.streams.open_trade_stream(&ticker, on_trade))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Trade stream for {} failed, closing quote stream: {}", ticker, e);
                if !self.close_handle(&ticker, quote).await {
                    error!("Quote stream for {} is still open after a failed subscribe", ticker);
                }
                return Err(e.into());
            }
        };

        self.router.entries.insert(
            ticker.clone(),
            SubscriptionEntry {
                symbol: symbol.to_string(),
                quote,
                trade,
            },
        );
        info!("Subscribed {} ({})", symbol, ticker);
        Ok(())
    }

    /// Remove the entry and close its streams; no-op if not subscribed
    pub async fn unsubscribe(&self, symbol: &str) -> Result<()> {
        let ticker = self.symbols.to_broker_ticker(symbol)?;
        let _changes = self.changes.lock().await;
        self.close_orphans().await;

        // Remove first so in-flight messages are dropped from here on
        let Some((_, entry)) = self.router.entries.remove(&ticker) else {
            return Ok(());
        };
        self.close_entry(&ticker, entry).await;
        info!("Unsubscribed {} ({})", symbol, ticker);
        Ok(())
    }

    /// Drop every subscription
    pub async fn close_all(&self) {
        let _changes = self.changes.lock().await;
        self.close_orphans().await;
        let tickers: Vec<String> = self
            .router
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for ticker in tickers {
            if let Some((_, entry)) = self.router.entries.remove(&ticker) {
                self.close_entry(&ticker, entry).await;
            }
        }
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.router
            .entries
            .iter()
            .any(|entry| entry.value().symbol == symbol)
    }

    pub fn entry(&self, ticker: &str) -> Option<SubscriptionEntry> {
        self.router.entries.get(ticker).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.router.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.router.entries.is_empty()
    }

    /// Streams still open at the brokerage although nothing routes them
    pub fn orphaned_streams(&self) -> usize {
        self.orphans.lock().len()
    }

    async fn close_entry(&self, ticker: &str, entry: SubscriptionEntry) {
        for handle in [entry.quote, entry.trade] {
            self.close_handle(ticker, handle).await;
        }
    }

    /// Close with one retry; a stream that stays open becomes an orphan
    async fn close_handle(&self, ticker: &str, handle: StreamHandle) -> bool {
        for attempt in 1..=2 {
            match self
                .guard
                .run("close_stream", self.streams.close_stream(handle))
                .await
            {
                Ok(()) => return true,
                Err(e) => warn!(
                    "Closing {} stream for {} failed (attempt {}): {}",
                    handle.kind, ticker, attempt, e
                ),
            }
        }

        self.orphans.lock().push((ticker.to_string(), handle));
        false
    }

    async fn close_orphans(&self) {
        let orphans = std::mem::take(&mut *self.orphans.lock());
        for (ticker, handle) in orphans {
            if self.close_handle(&ticker, handle).await {
                info!("Closed orphaned {} stream for {}", handle.kind, ticker);
            }
        }
    }
}
