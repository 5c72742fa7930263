use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{TransportError, TransportResult};
use crate::mapping::BrokerOrderStatus;
use crate::messages::{
    BrokerCandle, BrokerCash, BrokerOrderRecord, BrokerOrderType, BrokerPosition, CandleRequest,
    OrderUpdateMessage, PlaceOrderRequest, QuoteMessage, TradeMessage, Transaction,
};
use crate::transport::{
    BrokerageTransport, OrderUpdateCallback, QuoteCallback, StreamKind, TradeCallback,
};

/// Injected failures, each consumed or matched per call
#[derive(Default)]
struct Faults {
    next_place: Option<TransportError>,
    next_open_orders: Option<TransportError>,
    next_transactions: Option<TransportError>,
    cancels: HashMap<String, TransportError>,
    streams: HashSet<(String, StreamKind)>,
    failing_closes: usize,
}

pub(super) struct SimState {
    next_order_id: AtomicU64,
    pub(super) next_stream_id: AtomicU64,
    orders: DashMap<String, BrokerOrderRecord>,
    order_listener: Mutex<Option<OrderUpdateCallback>>,
    transactions: DashMap<String, Vec<Transaction>>,
    positions: Mutex<Vec<BrokerPosition>>,
    cash: Mutex<Vec<BrokerCash>>,
    candles: DashMap<String, Vec<BrokerCandle>>,
    candle_requests: Mutex<Vec<CandleRequest>>,
    cancel_requests: Mutex<Vec<String>>,
    pub(super) quote_streams: DashMap<u64, (String, QuoteCallback)>,
    pub(super) trade_streams: DashMap<u64, (String, TradeCallback)>,
    faults: Mutex<Faults>,
    next_split: Mutex<Option<usize>>,
    latency: Mutex<Option<Duration>>,
}

/// In-process brokerage implementing [`BrokerageTransport`] and
/// [`crate::MarketDataStreams`]. Clones share the same account.
#[derive(Clone)]
pub struct SimulatedBrokerage {
    pub(super) state: Arc<SimState>,
}

impl SimulatedBrokerage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SimState {
                next_order_id: AtomicU64::new(1),
                next_stream_id: AtomicU64::new(1),
                orders: DashMap::new(),
                order_listener: Mutex::new(None),
                transactions: DashMap::new(),
                positions: Mutex::new(Vec::new()),
                cash: Mutex::new(Vec::new()),
                candles: DashMap::new(),
                candle_requests: Mutex::new(Vec::new()),
                cancel_requests: Mutex::new(Vec::new()),
                quote_streams: DashMap::new(),
                trade_streams: DashMap::new(),
                faults: Mutex::new(Faults::default()),
                next_split: Mutex::new(None),
                latency: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Order lifecycle hooks
    // ------------------------------------------------------------------

    /// Mark an order as working with `filled` cumulative quantity and push it
    pub fn work(&self, order_id: &str, filled: Decimal) -> TransportResult<()> {
        let update = self.transition(order_id, BrokerOrderStatus::Working, |record| {
            record.filled_quantity = filled;
        })?;
        self.push(update.with_fill(filled, None));
        Ok(())
    }

    /// Completely fill an order at `price` and push it
    pub fn fill(&self, order_id: &str, price: Decimal) -> TransportResult<()> {
        let mut quantity = Decimal::ZERO;
        let update = self.transition(order_id, BrokerOrderStatus::Filled, |record| {
            record.filled_quantity = record.quantity;
            record.avg_fill_price = Some(price);
            quantity = record.quantity;
        })?;
        self.push(update.with_fill(quantity, Some(price)));
        Ok(())
    }

    /// Reject an order and push it
    pub fn reject(&self, order_id: &str) -> TransportResult<()> {
        let update = self.transition(order_id, BrokerOrderStatus::Rejected, |_| {})?;
        self.push(update);
        Ok(())
    }

    /// Deliver an arbitrary update, e.g. a duplicate or an unknown status code
    pub fn push_update(&self, update: OrderUpdateMessage) -> bool {
        self.push(update)
    }

    /// Decode and deliver a raw JSON frame
    pub fn push_frame(&self, frame: &str) -> TransportResult<bool> {
        let update = OrderUpdateMessage::from_json(frame)?;
        Ok(self.push(update))
    }

    /// Store an order as if placed by another session; nothing is pushed
    pub fn insert_record(&self, record: BrokerOrderRecord) {
        self.state.orders.insert(record.order_id.clone(), record);
    }

    /// Change an order's status without pushing, as if the notice was lost
    pub fn set_status_silently(
        &self,
        order_id: &str,
        status: BrokerOrderStatus,
    ) -> TransportResult<()> {
        self.transition(order_id, status, |_| {}).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Account hooks
    // ------------------------------------------------------------------

    /// Post a commission for an order; postings are negative amounts
    pub fn add_fee(&self, order_id: &str, amount: Decimal, currency: &str) {
        self.add_transaction(Transaction {
            order_id: order_id.to_string(),
            kind: "commission".to_string(),
            amount: -amount.abs(),
            currency: currency.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn add_transaction(&self, transaction: Transaction) {
        self.state
            .transactions
            .entry(transaction.order_id.clone())
            .or_default()
            .push(transaction);
    }

    pub fn set_positions(&self, positions: Vec<BrokerPosition>) {
        *self.state.positions.lock() = positions;
    }

    pub fn set_cash(&self, cash: Vec<BrokerCash>) {
        *self.state.cash.lock() = cash;
    }

    pub fn add_candles(&self, ticker: &str, candles: impl IntoIterator<Item = BrokerCandle>) {
        self.state
            .candles
            .entry(ticker.to_string())
            .or_default()
            .extend(candles);
    }

    // ------------------------------------------------------------------
    // Market data hooks
    // ------------------------------------------------------------------

    /// Deliver a quote to every open quote stream for its ticker
    pub fn emit_quote(&self, quote: QuoteMessage) -> usize {
        let callbacks: Vec<QuoteCallback> = self
            .state
            .quote_streams
            .iter()
            .filter(|entry| entry.value().0 == quote.ticker)
            .map(|entry| Arc::clone(&entry.value().1))
            .collect();

        for callback in &callbacks {
            callback(quote.clone());
        }
        callbacks.len()
    }

    /// Deliver a trade to every open trade stream for its ticker
    pub fn emit_trade(&self, trade: TradeMessage) -> usize {
        let callbacks: Vec<TradeCallback> = self
            .state
            .trade_streams
            .iter()
            .filter(|entry| entry.value().0 == trade.ticker)
            .map(|entry| Arc::clone(&entry.value().1))
            .collect();

        for callback in &callbacks {
            callback(trade.clone());
        }
        callbacks.len()
    }

    // ------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------

    pub fn fail_next_place(&self, error: TransportError) {
        self.state.faults.lock().next_place = Some(error);
    }

    pub fn fail_next_open_orders(&self, error: TransportError) {
        self.state.faults.lock().next_open_orders = Some(error);
    }

    pub fn fail_next_transactions(&self, error: TransportError) {
        self.state.faults.lock().next_transactions = Some(error);
    }

    /// Every cancellation of `order_id` fails with `error` until cleared
    pub fn fail_cancel(&self, order_id: &str, error: TransportError) {
        self.state
            .faults
            .lock()
            .cancels
            .insert(order_id.to_string(), error);
    }

    /// Opening `kind` streams for `ticker` is refused until cleared
    pub fn fail_stream(&self, ticker: &str, kind: StreamKind) {
        self.state
            .faults
            .lock()
            .streams
            .insert((ticker.to_string(), kind));
    }

    /// The next `count` stream closes fail
    pub fn fail_next_closes(&self, count: usize) {
        self.state.faults.lock().failing_closes = count;
    }

    /// Consume one injected close failure, if any is armed
    pub(super) fn close_fault(&self) -> bool {
        let mut faults = self.state.faults.lock();
        if faults.failing_closes == 0 {
            return false;
        }
        faults.failing_closes -= 1;
        true
    }

    pub fn clear_faults(&self) {
        *self.state.faults.lock() = Faults::default();
    }

    /// Accept the next placement as `parts` separate brokerage orders
    pub fn split_next_place(&self, parts: usize) {
        *self.state.next_split.lock() = Some(parts.max(1));
    }

    /// Delay applied to every request/response call
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.state.latency.lock() = latency;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn order(&self, order_id: &str) -> Option<BrokerOrderRecord> {
        self.state.orders.get(order_id).map(|r| r.value().clone())
    }

    pub fn order_count(&self) -> usize {
        self.state.orders.len()
    }

    /// Ids passed to `cancel_order`, in call order
    pub fn cancel_requests(&self) -> Vec<String> {
        self.state.cancel_requests.lock().clone()
    }

    pub fn candle_requests(&self) -> Vec<CandleRequest> {
        self.state.candle_requests.lock().clone()
    }

    pub fn has_order_listener(&self) -> bool {
        self.state.order_listener.lock().is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(super) async fn simulate_latency(&self) {
        let latency = *self.state.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub(super) fn stream_fault(&self, ticker: &str, kind: StreamKind) -> bool {
        self.state
            .faults
            .lock()
            .streams
            .contains(&(ticker.to_string(), kind))
    }

    fn next_order_id(&self) -> String {
        format!("SIM-{}", self.state.next_order_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Invoke the registered callback outside of any lock
    fn push(&self, update: OrderUpdateMessage) -> bool {
        let listener = self.state.order_listener.lock().clone();
        match listener {
            Some(callback) => {
                debug!("Pushing {} for {}", update.status, update.order_id);
                callback(update);
                true
            }
            None => {
                debug!("No listener for update {} of {}", update.status, update.order_id);
                false
            }
        }
    }

    fn transition(
        &self,
        order_id: &str,
        status: BrokerOrderStatus,
        apply: impl FnOnce(&mut BrokerOrderRecord),
    ) -> TransportResult<OrderUpdateMessage> {
        let mut record = self
            .state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| TransportError::api(404, format!("order {order_id} not found")))?;

        record.status = status.as_str().to_string();
        apply(&mut record);
        Ok(OrderUpdateMessage::new(
            order_id,
            record.ticker.clone(),
            status.as_str(),
            Utc::now(),
        ))
    }

    fn record_status(record: &BrokerOrderRecord) -> Option<BrokerOrderStatus> {
        record.status.parse().ok()
    }

    fn check_request(request: &PlaceOrderRequest) -> TransportResult<()> {
        if request.quantity <= Decimal::ZERO {
            return Err(TransportError::api(422, "quantity must be positive"));
        }
        let needs_limit = matches!(
            request.order_type,
            BrokerOrderType::Limit | BrokerOrderType::StopLimit
        );
        let needs_stop = matches!(
            request.order_type,
            BrokerOrderType::Stop | BrokerOrderType::StopLimit
        );
        if needs_limit && request.limit_price.is_none() {
            return Err(TransportError::api(422, "limit price required"));
        }
        if needs_stop && request.stop_price.is_none() {
            return Err(TransportError::api(422, "stop price required"));
        }
        Ok(())
    }

    /// Store a new pending order and push its "pending" notice
    fn accept(&self, request: &PlaceOrderRequest) -> BrokerOrderRecord {
        let order_id = self.next_order_id();
        let record = BrokerOrderRecord::accepted(
            order_id.clone(),
            request,
            BrokerOrderStatus::Pending.as_str(),
            Utc::now(),
        );
        self.state.orders.insert(order_id.clone(), record.clone());
        info!(
            "Accepted {} {} {} {} as {}",
            request.order_type.as_str(),
            request.side.as_str(),
            request.quantity,
            request.ticker,
            order_id
        );

        self.push(OrderUpdateMessage::new(
            &order_id,
            &record.ticker,
            BrokerOrderStatus::Pending.as_str(),
            record.created_at,
        ));
        record
    }
}

impl Default for SimulatedBrokerage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerageTransport for SimulatedBrokerage {
    async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> TransportResult<Vec<BrokerOrderRecord>> {
        self.simulate_latency().await;

        if let Some(error) = self.state.faults.lock().next_place.take() {
            warn!("Injected placement failure: {}", error);
            return Err(error);
        }
        Self::check_request(&request)?;

        let parts = self.state.next_split.lock().take().unwrap_or(1);
        if parts == 1 {
            return Ok(vec![self.accept(&request)]);
        }

        let slice = (request.quantity / Decimal::from(parts)).trunc();
        let mut remaining = request.quantity;
        let mut records = Vec::with_capacity(parts);
        for part in 0..parts {
            let quantity = if part + 1 == parts { remaining } else { slice };
            remaining -= quantity;
            let child = PlaceOrderRequest {
                quantity,
                ..request.clone()
            };
            records.push(self.accept(&child));
        }
        Ok(records)
    }

    async fn replace_order(
        &self,
        order_id: &str,
        request: PlaceOrderRequest,
    ) -> TransportResult<Vec<BrokerOrderRecord>> {
        self.simulate_latency().await;
        Self::check_request(&request)?;

        let ticker = {
            let mut record = self
                .state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| TransportError::api(404, format!("order {order_id} not found")))?;
            if Self::record_status(&record).is_none_or(|s| s.is_final()) {
                return Err(TransportError::api(
                    400,
                    format!("order {order_id} is no longer working"),
                ));
            }
            record.status = BrokerOrderStatus::Cancelled.as_str().to_string();
            record.ticker.clone()
        };

        self.push(OrderUpdateMessage::new(
            order_id,
            ticker,
            BrokerOrderStatus::Cancelled.as_str(),
            Utc::now(),
        ));

        let replacement = self.accept(&request);
        info!("Replaced {} with {}", order_id, replacement.order_id);
        Ok(vec![replacement])
    }

    async fn cancel_order(&self, order_id: &str) -> TransportResult<()> {
        self.simulate_latency().await;
        self.state.cancel_requests.lock().push(order_id.to_string());

        if let Some(error) = self.state.faults.lock().cancels.get(order_id).cloned() {
            warn!("Injected cancel failure for {}: {}", order_id, error);
            return Err(error);
        }

        let update = {
            let mut record = self
                .state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| TransportError::api(404, format!("order {order_id} not found")))?;

            match Self::record_status(&record) {
                Some(BrokerOrderStatus::Cancelled) => return Ok(()),
                Some(status) if status.is_final() => {
                    return Err(TransportError::api(
                        400,
                        format!("order {order_id} is already {status}"),
                    ));
                }
                _ => {}
            }

            record.status = BrokerOrderStatus::Cancelled.as_str().to_string();
            OrderUpdateMessage::new(
                order_id,
                record.ticker.clone(),
                BrokerOrderStatus::Cancelled.as_str(),
                Utc::now(),
            )
        };

        self.push(update);
        Ok(())
    }

    async fn open_orders(&self) -> TransportResult<Vec<BrokerOrderRecord>> {
        self.simulate_latency().await;

        if let Some(error) = self.state.faults.lock().next_open_orders.take() {
            return Err(error);
        }

        let mut open: Vec<BrokerOrderRecord> = self
            .state
            .orders
            .iter()
            .filter(|entry| !Self::record_status(entry.value()).is_some_and(|s| s.is_final()))
            .map(|entry| entry.value().clone())
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(open)
    }

    async fn transactions(&self, order_id: &str) -> TransportResult<Vec<Transaction>> {
        self.simulate_latency().await;

        if let Some(error) = self.state.faults.lock().next_transactions.take() {
            return Err(error);
        }

        Ok(self
            .state
            .transactions
            .get(order_id)
            .map(|postings| postings.value().clone())
            .unwrap_or_default())
    }

    async fn positions(&self) -> TransportResult<Vec<BrokerPosition>> {
        self.simulate_latency().await;
        Ok(self.state.positions.lock().clone())
    }

    async fn cash_balances(&self) -> TransportResult<Vec<BrokerCash>> {
        self.simulate_latency().await;
        Ok(self.state.cash.lock().clone())
    }

    async fn candles(&self, request: CandleRequest) -> TransportResult<Vec<BrokerCandle>> {
        self.simulate_latency().await;

        let candles = self
            .state
            .candles
            .get(&request.ticker)
            .map(|all| {
                all.value()
                    .iter()
                    .filter(|c| c.time >= request.start && c.time < request.end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        self.state.candle_requests.lock().push(request);
        Ok(candles)
    }

    async fn register_order_updates(&self, callback: OrderUpdateCallback) -> TransportResult<()> {
        *self.state.order_listener.lock() = Some(callback);
        Ok(())
    }

    async fn clear_order_updates(&self) {
        self.state.order_listener.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{BrokerSide, BrokerTimeInForce};
    use rust_decimal_macros::dec;

    fn limit_buy() -> PlaceOrderRequest {
        PlaceOrderRequest::limit(
            "client-1",
            "AAPL.US",
            BrokerSide::Buy,
            dec!(10),
            dec!(100),
            BrokerTimeInForce::Gtc,
        )
    }

    fn recording_listener(sim: &SimulatedBrokerage) -> Arc<Mutex<Vec<OrderUpdateMessage>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        *sim.state.order_listener.lock() = Some(Arc::new(move |u| sink.lock().push(u)));
        seen
    }

    fn statuses(seen: &Mutex<Vec<OrderUpdateMessage>>) -> Vec<(String, String)> {
        seen.lock()
            .iter()
            .map(|u| (u.order_id.clone(), u.status.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_place_pushes_pending() {
        let sim = SimulatedBrokerage::new();
        let seen = recording_listener(&sim);

        let records = sim.place_order(limit_buy()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].order_id, "SIM-1");
        assert_eq!(records[0].status, "pending");
        assert_eq!(
            statuses(&seen),
            vec![("SIM-1".to_string(), "pending".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fill_reports_full_quantity() {
        let sim = SimulatedBrokerage::new();
        let seen = recording_listener(&sim);
        sim.place_order(limit_buy()).await.unwrap();

        sim.work("SIM-1", dec!(4)).unwrap();
        sim.fill("SIM-1", dec!(99.5)).unwrap();

        let updates = seen.lock().clone();
        assert_eq!(updates[1].status, "working");
        assert_eq!(updates[1].filled_quantity, Some(dec!(4)));
        assert_eq!(updates[2].status, "filled");
        assert_eq!(updates[2].filled_quantity, Some(dec!(10)));
        assert_eq!(updates[2].avg_fill_price, Some(dec!(99.5)));
        assert!(sim.open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_cancels_original() {
        let sim = SimulatedBrokerage::new();
        let seen = recording_listener(&sim);
        sim.place_order(limit_buy()).await.unwrap();

        let mut request = limit_buy();
        request.limit_price = Some(dec!(101));
        let records = sim.replace_order("SIM-1", request).await.unwrap();

        assert_eq!(records[0].order_id, "SIM-2");
        assert_eq!(records[0].limit_price, Some(dec!(101)));
        assert_eq!(sim.order("SIM-1").unwrap().status, "cancelled");
        assert_eq!(
            statuses(&seen)[1..],
            [
                ("SIM-1".to_string(), "cancelled".to_string()),
                ("SIM-2".to_string(), "pending".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_semantics() {
        let sim = SimulatedBrokerage::new();
        let seen = recording_listener(&sim);
        sim.place_order(limit_buy()).await.unwrap();
        sim.place_order(limit_buy()).await.unwrap();
        sim.fill("SIM-2", dec!(100)).unwrap();

        sim.cancel_order("SIM-1").await.unwrap();
        // Cancelling twice is accepted without a second notice
        sim.cancel_order("SIM-1").await.unwrap();
        let cancel_notices = statuses(&seen)
            .into_iter()
            .filter(|(_, status)| status == "cancelled")
            .count();
        assert_eq!(cancel_notices, 1);

        let filled = sim.cancel_order("SIM-2").await.unwrap_err();
        assert_eq!(filled.status_code(), Some(400));

        let missing = sim.cancel_order("SIM-9").await.unwrap_err();
        assert_eq!(missing.status_code(), Some(404));

        assert_eq!(sim.cancel_requests(), vec!["SIM-1", "SIM-1", "SIM-2", "SIM-9"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let sim = SimulatedBrokerage::new();
        sim.fail_next_place(TransportError::Connection("reset by peer".to_string()));

        assert!(matches!(
            sim.place_order(limit_buy()).await,
            Err(TransportError::Connection(_))
        ));
        // Only the next call fails
        assert!(sim.place_order(limit_buy()).await.is_ok());

        sim.fail_cancel("SIM-1", TransportError::api(500, "internal"));
        assert_eq!(
            sim.cancel_order("SIM-1").await.unwrap_err().status_code(),
            Some(500)
        );
        sim.clear_faults();
        assert!(sim.cancel_order("SIM-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_split_placement() {
        let sim = SimulatedBrokerage::new();
        sim.split_next_place(3);

        let records = sim.place_order(limit_buy()).await.unwrap();
        let quantities: Vec<Decimal> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, vec![dec!(3), dec!(3), dec!(4)]);

        // Split applies to one placement only
        assert_eq!(sim.place_order(limit_buy()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let sim = SimulatedBrokerage::new();
        let mut request = limit_buy();
        request.limit_price = None;

        let error = sim.place_order(request).await.unwrap_err();
        assert_eq!(error.status_code(), Some(422));
        assert_eq!(sim.order_count(), 0);
    }

    #[tokio::test]
    async fn test_candles_filtered_by_window() {
        let sim = SimulatedBrokerage::new();
        let base = Utc::now();
        sim.add_candles(
            "AAPL.US",
            (0..5).map(|i| BrokerCandle::flat(base + chrono::Duration::hours(i), dec!(100), dec!(1))),
        );

        let candles = sim
            .candles(CandleRequest {
                ticker: "AAPL.US".to_string(),
                interval: crate::messages::BrokerInterval::Hour,
                start: base + chrono::Duration::hours(1),
                end: base + chrono::Duration::hours(3),
            })
            .await
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(sim.candle_requests().len(), 1);
    }
}
