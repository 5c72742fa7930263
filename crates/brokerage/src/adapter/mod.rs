//! Brokerage Adapter
//!
//! The surface the trading engine talks to. Owns the order table, the
//! serialized mutator, the order-update consumer and the subscription
//! registry, and wires them to the transport ports.
//!
//! ```text
//!  place / modify / cancel / list_open_orders
//!        │ validate, then execute()
//!        ▼
//!  ┌───────────────────┐   RPC (guarded)   ┌────────────────────┐
//!  │ SerializedMutator ├──────────────────►│ BrokerageTransport │
//!  └─────────▲─────────┘                   └─────────┬──────────┘
//!            │ submit(reconcile)                     │ push
//!  ┌─────────┴─────────┐                   ┌─────────▼──────────┐
//!  │ consumer task     │◄──────────────────┤ ingestion channel  │
//!  └───────────────────┘                   └────────────────────┘
//! ```

mod account;
mod orders;

use conduit_core::{BrokerageMessage, LocalOrder, MessageKind, OrderRef};
use conduit_gateway::{
    BrokerageTransport, IngestionReceiver, IngestionStats, MarketDataStreams,
    OrderUpdateCallback, OrderUpdateMessage, ingestion_channel,
};
use conduit_ports::{Clock, MarketDataSink, OrderEventSink, SymbolMapper};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::BrokerageConfig;
use crate::error::{Error, Result};
use crate::fees::FeeResolver;
use crate::guard::RpcGuard;
use crate::mutator::{MutatorHandle, MutatorStats, SerializedMutator};
use crate::order_table::OrderTable;
use crate::reconciliation::Reconciler;
use crate::subscriptions::SubscriptionRegistry;

/// Collaborators the adapter is built from
#[derive(Clone)]
pub struct BrokerageDeps {
    pub transport: Arc<dyn BrokerageTransport>,
    pub streams: Arc<dyn MarketDataStreams>,
    pub symbols: Arc<dyn SymbolMapper>,
    pub events: Arc<dyn OrderEventSink>,
    pub market_data: Arc<dyn MarketDataSink>,
    pub clock: Arc<dyn Clock>,
}

/// State shared between the public handle and the units it queues
struct Inner {
    config: BrokerageConfig,
    transport: Arc<dyn BrokerageTransport>,
    symbols: Arc<dyn SymbolMapper>,
    events: Arc<dyn OrderEventSink>,
    clock: Arc<dyn Clock>,
    table: Arc<OrderTable>,
    guard: Arc<RpcGuard>,
    reconciler: Arc<Reconciler>,
    subscriptions: SubscriptionRegistry,
    connected: AtomicBool,
    sessions: AtomicU64,
    ingestion: Mutex<Option<Arc<IngestionStats>>>,
}

impl Inner {
    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Tell the engine an operation failed; the caller still gets the result
    fn report(&self, kind: MessageKind, code: &str, message: String) {
        self.events.notify(BrokerageMessage::new(kind, code, message));
    }
}

/// How long a reconnect waits for the previous session's consumer to forward
/// the updates it already received
const CONSUMER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Brokerage {
    inner: Arc<Inner>,
    mutator: MutatorHandle,
    mutator_task: JoinHandle<()>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Brokerage {
    /// Build the adapter and start its mutator. Must be called inside a tokio
    /// runtime. The adapter starts disconnected.
    pub fn new(deps: BrokerageDeps, config: BrokerageConfig) -> Result<Self> {
        config.validate()?;

        let table = Arc::new(OrderTable::new());
        let guard = Arc::new(RpcGuard::new(config.rpc_timeout()));
        let fees = FeeResolver::new(
            Arc::clone(&deps.transport),
            Arc::clone(&guard),
            config.account_currency.clone(),
            config.fee_settlement_delay(),
        );
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&table),
            fees,
            Arc::clone(&deps.events),
            Arc::clone(&deps.clock),
        ));
        let subscriptions = SubscriptionRegistry::new(
            deps.streams,
            Arc::clone(&deps.symbols),
            deps.market_data,
            Arc::clone(&guard),
        );

        let (mutator, mutator_task) = SerializedMutator::spawn();

        let inner = Arc::new(Inner {
            config,
            transport: deps.transport,
            symbols: deps.symbols,
            events: deps.events,
            clock: deps.clock,
            table,
            guard,
            reconciler,
            subscriptions,
            connected: AtomicBool::new(false),
            sessions: AtomicU64::new(0),
            ingestion: Mutex::new(None),
        });

        Ok(Self {
            inner,
            mutator,
            mutator_task,
            consumer: Mutex::new(None),
        })
    }

    /// Start receiving order updates and rebuild the order table.
    ///
    /// The push feed is live before the refresh runs, so nothing placed in
    /// between is missed. A failed refresh is returned but leaves the adapter
    /// connected; `list_open_orders` can be retried.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        let previous = self.consumer.lock().take();
        if let Some(previous) = previous {
            drain_consumer(previous).await;
        }

        let (sender, receiver) = ingestion_channel::<OrderUpdateMessage>();
        let stats = receiver.stats();
        let callback: OrderUpdateCallback = Arc::new(move |update| {
            if let Err(e) = sender.push(update) {
                warn!("Dropping order update: {}", e);
            }
        });
        self.inner
            .guard
            .run(
                "register_order_updates",
                self.inner.transport.register_order_updates(callback),
            )
            .await?;

        *self.inner.ingestion.lock() = Some(stats);
        let consumer = tokio::spawn(consume_updates(
            receiver,
            self.mutator.clone(),
            Arc::clone(&self.inner.reconciler),
        ));
        if let Some(stale) = self.consumer.lock().replace(consumer) {
            stale.abort();
        }

        self.inner.connected.store(true, Ordering::Release);
        let (kind, code) = if self.inner.sessions.fetch_add(1, Ordering::AcqRel) == 0 {
            (MessageKind::Information, "Connected")
        } else {
            (MessageKind::Reconnect, "Reconnected")
        };
        self.inner.report(kind, code, "Order update feed registered".to_string());
        info!("Brokerage connected");

        let open = self.list_open_orders().await?;
        info!("Tracking {} open orders after connect", open.len());
        Ok(())
    }

    /// Stop the push feed, drop every market-data subscription and abandon
    /// calls in flight. Tracked orders are kept until the next refresh.
    pub async fn disconnect(&self) {
        if !self.inner.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        self.inner.guard.abort_in_flight();
        self.inner.transport.clear_order_updates().await;
        self.inner.subscriptions.close_all().await;

        self.inner.report(
            MessageKind::Disconnect,
            "Disconnected",
            "Order update feed and market data streams closed".to_string(),
        );
        info!("Brokerage disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Cancel every brokerage call currently running; each reports failure
    pub fn abort_in_flight(&self) {
        self.inner.guard.abort_in_flight();
    }

    /// Open quote and trade streams for `symbol`
    pub async fn subscribe(&self, symbol: &str) -> Result<()> {
        let result = self.inner.subscriptions.subscribe(symbol).await;
        if let Err(e) = &result {
            self.inner.report(
                MessageKind::Warning,
                "SubscribeFailed",
                format!("Could not subscribe to {symbol}: {e}"),
            );
        }
        self.report_orphaned_streams();
        result
    }

    pub async fn unsubscribe(&self, symbol: &str) -> Result<()> {
        let result = self.inner.subscriptions.unsubscribe(symbol).await;
        self.report_orphaned_streams();
        result
    }

    fn report_orphaned_streams(&self) {
        let orphaned = self.inner.subscriptions.orphaned_streams();
        if orphaned > 0 {
            self.inner.report(
                MessageKind::Error,
                "StreamCloseFailed",
                format!("{orphaned} market data stream(s) could not be closed; retrying later"),
            );
        }
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.inner.subscriptions.is_subscribed(symbol)
    }

    /// Wait until every order update pushed so far has been reconciled
    pub async fn settle(&self) -> Result<()> {
        loop {
            let stats = self.inner.ingestion.lock().clone();
            if let Some(stats) = &stats {
                while stats.in_flight() > 0 {
                    if self.mutator.is_closed() {
                        return Err(Error::MutatorClosed);
                    }
                    if !self.consumer_running() {
                        warn!("{} order updates left unforwarded", stats.in_flight());
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }

            self.mutator.flush().await?;

            // Units that just ran may have triggered further pushes
            if stats.is_none_or(|s| s.in_flight() == 0) {
                return Ok(());
            }
        }
    }

    fn consumer_running(&self) -> bool {
        self.consumer
            .lock()
            .as_ref()
            .is_some_and(|consumer| !consumer.is_finished())
    }

    /// Brokerage ids currently tracked
    pub fn tracked_ids(&self) -> Vec<String> {
        self.inner.table.broker_ids()
    }

    pub fn is_tracked(&self, broker_id: &str) -> bool {
        self.inner.table.contains(broker_id)
    }

    /// Engine order owning `broker_id`, if tracked
    pub fn tracked_order(&self, broker_id: &str) -> Option<OrderRef> {
        self.inner.table.get(broker_id).map(|tracked| tracked.order)
    }

    /// Tracked orders without a brokerage round trip
    pub fn cached_orders(&self) -> Vec<LocalOrder> {
        self.inner.table.snapshot()
    }

    pub fn mutator_stats(&self) -> MutatorStats {
        self.mutator.stats()
    }

    pub fn config(&self) -> &BrokerageConfig {
        &self.inner.config
    }
}

impl Drop for Brokerage {
    fn drop(&mut self) {
        if let Some(consumer) = self.consumer.lock().take() {
            consumer.abort();
        }
        self.mutator_task.abort();
    }
}

/// Wait for a previous session's consumer to run dry. Its sender went away
/// with the old push callback, so it ends once its backlog is queued.
async fn drain_consumer(consumer: JoinHandle<()>) {
    let abort = consumer.abort_handle();
    match tokio::time::timeout(CONSUMER_DRAIN_TIMEOUT, consumer).await {
        Ok(_) => debug!("Previous order update consumer drained"),
        Err(_) => {
            warn!("Previous order update consumer did not drain; aborting it");
            abort.abort();
        }
    }
}

/// Drain the ingestion channel, queueing one reconciliation unit per update
async fn consume_updates(
    mut receiver: IngestionReceiver<OrderUpdateMessage>,
    mutator: MutatorHandle,
    reconciler: Arc<Reconciler>,
) {
    debug!("Order update consumer started");

    while let Some(update) = receiver.next().await {
        let reconciler = Arc::clone(&reconciler);
        let queued = mutator.submit(async move { reconciler.handle(update).await });
        receiver.mark_forwarded();

        if queued.is_err() {
            warn!("Mutator closed; stopping order update consumer");
            break;
        }
    }

    debug!("Order update consumer stopped");
}
