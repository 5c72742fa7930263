//! Account queries and historical bars. Read-only: none of these touch the
//! order table, so they bypass the mutator.

use conduit_core::{Bar, CashAmount, HistoryRequest, Holding, MessageKind, OrderValidationError};
use conduit_gateway::CandleRequest;
use conduit_gateway::mapping::to_broker_interval;
use log::debug;

use super::Brokerage;
use crate::error::{Error, Result};

impl Brokerage {
    /// Current positions. A position in a ticker with no local symbol is an
    /// error rather than being silently left out.
    pub async fn list_holdings(&self) -> Result<Vec<Holding>> {
        let positions = self
            .inner
            .guard
            .run("positions", self.inner.transport.positions())
            .await
            .map_err(|e| self.query_failed("HoldingsFailed", "holdings", e.into()))?;

        positions
            .into_iter()
            .map(|position| {
                let symbol = self.inner.symbols.to_local(&position.ticker)?;
                Ok(Holding::new(
                    symbol,
                    position.quantity,
                    position.average_price,
                    position.market_price,
                    position.currency,
                ))
            })
            .collect()
    }

    pub async fn cash_balances(&self) -> Result<Vec<CashAmount>> {
        let balances = self
            .inner
            .guard
            .run("cash_balances", self.inner.transport.cash_balances())
            .await
            .map_err(|e| self.query_failed("CashBalancesFailed", "cash balances", e.into()))?;

        Ok(balances
            .into_iter()
            .map(|cash| CashAmount::new(cash.currency, cash.amount))
            .collect())
    }

    /// Download bars for `request`, one brokerage call per chunk of the window.
    ///
    /// Bars come back sorted by time, inside `[start, end)`, one per timestamp.
    pub async fn get_history(&self, request: &HistoryRequest) -> Result<Vec<Bar>> {
        request.validate()?;
        let interval = to_broker_interval(request.resolution)?;
        let span = self
            .inner
            .config
            .history
            .span(request.resolution)
            .ok_or_else(|| {
                OrderValidationError::UnsupportedResolution(request.resolution.to_string())
            })?;
        let ticker = self.inner.symbols.to_broker_ticker(&request.symbol)?;

        let mut bars = Vec::new();
        let mut chunk_start = request.start;
        while chunk_start < request.end {
            let chunk_end = (chunk_start + span).min(request.end);
            let chunk = CandleRequest {
                ticker: ticker.clone(),
                interval,
                start: chunk_start,
                end: chunk_end,
            };

            let candles = self
                .inner
                .guard
                .run("candles", self.inner.transport.candles(chunk))
                .await
                .map_err(|e| self.query_failed("HistoryFailed", "history", e.into()))?;
            debug!(
                "{} {} candles for {} in [{}, {})",
                candles.len(),
                request.resolution,
                ticker,
                chunk_start,
                chunk_end
            );

            bars.extend(
                candles
                    .into_iter()
                    .filter(|candle| request.contains(candle.time))
                    .map(|candle| Bar {
                        symbol: request.symbol.clone(),
                        time: candle.time,
                        open: candle.open,
                        high: candle.high,
                        low: candle.low,
                        close: candle.close,
                        volume: candle.volume,
                    }),
            );
            chunk_start = chunk_end;
        }

        bars.sort_by_key(|bar| bar.time);
        bars.dedup_by_key(|bar| bar.time);
        Ok(bars)
    }

    fn query_failed(&self, code: &str, what: &str, error: Error) -> Error {
        self.inner.report(
            MessageKind::Warning,
            code,
            format!("Could not fetch {what}: {error}"),
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::adapter;
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use conduit_core::Resolution;
    use conduit_gateway::{BrokerCandle, BrokerCash, BrokerInterval, BrokerPosition};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_holdings_and_cash() {
        let h = adapter().await;
        h.sim.set_positions(vec![BrokerPosition {
            ticker: "AAPL.US".to_string(),
            quantity: dec!(-5),
            average_price: dec!(100),
            market_price: dec!(90),
            currency: "USD".to_string(),
        }]);
        h.sim.set_cash(vec![BrokerCash {
            currency: "USD".to_string(),
            amount: dec!(2500.50),
        }]);

        let holdings = h.brokerage.list_holdings().await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "AAPL");
        assert_eq!(holdings[0].unrealized_pnl(), dec!(50));

        let cash = h.brokerage.cash_balances().await.unwrap();
        assert_eq!(cash, vec![CashAmount::new("USD", dec!(2500.50))]);
    }

    #[tokio::test]
    async fn test_holding_in_unknown_ticker_fails() {
        let h = adapter().await;
        h.sim.set_positions(vec![BrokerPosition {
            ticker: "GME.US".to_string(),
            quantity: dec!(1),
            average_price: dec!(20),
            market_price: dec!(25),
            currency: "USD".to_string(),
        }]);

        assert!(matches!(
            h.brokerage.list_holdings().await,
            Err(Error::Symbol(_))
        ));
    }

    #[tokio::test]
    async fn test_history_chunks_window_and_cleans_bars() {
        let h = adapter().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(12);

        let mut candles: Vec<BrokerCandle> = (0..14)
            .map(|day| BrokerCandle::flat(start + Duration::days(day - 1), dec!(100), dec!(10)))
            .collect();
        // Same timestamp delivered twice
        candles.push(BrokerCandle::flat(start + Duration::days(3), dec!(100), dec!(10)));
        candles.reverse();
        h.sim.add_candles("AAPL.US", candles);

        let request = HistoryRequest::new("AAPL", Resolution::Minute, start, end);
        let bars = h.brokerage.get_history(&request).await.unwrap();

        // Minute history is fetched five days at a time
        let chunks = h.sim.candle_requests();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.interval == BrokerInterval::Minute));
        assert_eq!(chunks[0].start, start);
        assert_eq!(chunks[2].end, end);

        assert_eq!(bars.len(), 12);
        assert_eq!(bars.first().map(|b| b.time), Some(start));
        assert!(bars.windows(2).all(|w| w[0].time < w[1].time));
        assert!(bars.iter().all(|b| request.contains(b.time)));
    }

    #[tokio::test]
    async fn test_history_rejects_bad_requests() {
        let h = adapter().await;
        let start = Utc::now();

        let inverted = HistoryRequest::new("AAPL", Resolution::Daily, start, start);
        assert!(matches!(
            h.brokerage.get_history(&inverted).await,
            Err(Error::Validation(OrderValidationError::InvalidHistoryWindow { .. }))
        ));

        let ticks = HistoryRequest::new("AAPL", Resolution::Tick, start, start + Duration::hours(1));
        assert!(matches!(
            h.brokerage.get_history(&ticks).await,
            Err(Error::Validation(OrderValidationError::UnsupportedResolution(_)))
        ));
        assert!(h.sim.candle_requests().is_empty());
    }
}
