use async_trait::async_trait;
use log::{debug, warn};
use std::sync::atomic::Ordering;

use super::SimulatedBrokerage;
use crate::error::{TransportError, TransportResult};
use crate::transport::{MarketDataStreams, QuoteCallback, StreamHandle, StreamKind, TradeCallback};

impl SimulatedBrokerage {
    /// Number of currently open quote and trade streams
    pub fn open_stream_count(&self) -> usize {
        self.state.quote_streams.len() + self.state.trade_streams.len()
    }

    pub fn open_streams_for(&self, ticker: &str) -> usize {
        let quotes = self
            .state
            .quote_streams
            .iter()
            .filter(|entry| entry.value().0 == ticker)
            .count();
        let trades = self
            .state
            .trade_streams
            .iter()
            .filter(|entry| entry.value().0 == ticker)
            .count();
        quotes + trades
    }

    async fn open_stream(&self, ticker: &str, kind: StreamKind) -> TransportResult<StreamHandle> {
        self.simulate_latency().await;

        if self.stream_fault(ticker, kind) {
            warn!("Refusing {} stream for {}", kind, ticker);
            return Err(TransportError::Connection(format!(
                "{kind} stream for {ticker} refused"
            )));
        }

        let id = self.state.next_stream_id.fetch_add(1, Ordering::Relaxed);
        debug!("Opened {} stream {} for {}", kind, id, ticker);
        Ok(StreamHandle { id, kind })
    }
}

#[async_trait]
impl MarketDataStreams for SimulatedBrokerage {
    async fn open_quote_stream(
        &self,
        ticker: &str,
        callback: QuoteCallback,
    ) -> TransportResult<StreamHandle> {
        let handle = self.open_stream(ticker, StreamKind::Quote).await?;
        self.state
            .quote_streams
            .insert(handle.id, (ticker.to_string(), callback));
        Ok(handle)
    }

    async fn open_trade_stream(
        &self,
        ticker: &str,
        callback: TradeCallback,
    ) -> TransportResult<StreamHandle> {
        let handle = self.open_stream(ticker, StreamKind::Trade).await?;
        self.state
            .trade_streams
            .insert(handle.id, (ticker.to_string(), callback));
        Ok(handle)
    }

    async fn close_stream(&self, handle: StreamHandle) -> TransportResult<()> {
        if self.close_fault() {
            warn!("Refusing to close {} stream {}", handle.kind, handle.id);
            return Err(TransportError::Connection(format!(
                "close of {} stream {} refused",
                handle.kind, handle.id
            )));
        }

        let removed = match handle.kind {
            StreamKind::Quote => self.state.quote_streams.remove(&handle.id).is_some(),
            StreamKind::Trade => self.state.trade_streams.remove(&handle.id).is_some(),
        };
        if removed {
            debug!("Closed {} stream {}", handle.kind, handle.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{QuoteMessage, TradeMessage};
    use chrono::Utc;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_quotes_reach_open_streams_only() {
        let sim = SimulatedBrokerage::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = sim
            .open_quote_stream("AAPL.US", Arc::new(move |q: QuoteMessage| sink.lock().push(q)))
            .await
            .unwrap();
        assert_eq!(sim.open_streams_for("AAPL.US"), 1);

        let quote = QuoteMessage::new("AAPL.US", (dec!(99), dec!(1)), (dec!(101), dec!(1)), Utc::now());
        assert_eq!(sim.emit_quote(quote.clone()), 1);
        let other = QuoteMessage { ticker: "MSFT.US".to_string(), ..quote.clone() };
        assert_eq!(sim.emit_quote(other), 0);

        sim.close_stream(handle).await.unwrap();
        assert_eq!(sim.emit_quote(quote), 0);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(sim.open_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_fault_is_per_kind() {
        let sim = SimulatedBrokerage::new();
        sim.fail_stream("AAPL.US", StreamKind::Trade);

        let quote = sim
            .open_quote_stream("AAPL.US", Arc::new(|_: QuoteMessage| {}))
            .await;
        let trade = sim
            .open_trade_stream("AAPL.US", Arc::new(|_: TradeMessage| {}))
            .await;

        assert!(quote.is_ok());
        assert!(matches!(trade, Err(TransportError::Connection(_))));
        assert_eq!(sim.open_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_close_failures_are_counted() {
        let sim = SimulatedBrokerage::new();
        let handle = sim
            .open_quote_stream("AAPL.US", Arc::new(|_: QuoteMessage| {}))
            .await
            .unwrap();
        sim.fail_next_closes(1);

        assert!(matches!(
            sim.close_stream(handle).await,
            Err(TransportError::Connection(_))
        ));
        assert_eq!(sim.open_stream_count(), 1);

        sim.close_stream(handle).await.unwrap();
        assert_eq!(sim.open_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_close_unknown_handle_is_noop() {
        let sim = SimulatedBrokerage::new();
        let handle = StreamHandle { id: 42, kind: StreamKind::Trade };
        assert!(sim.close_stream(handle).await.is_ok());
    }
}
