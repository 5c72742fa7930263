use conduit_core::{BrokerageMessage, OrderEvent, Tick};

/// Engine-side receiver of order events and notifications.
///
/// Both calls are fire-and-forget and are invoked from inside the adapter's
/// serialized section, so implementations must return promptly.
pub trait OrderEventSink: Send + Sync {
    fn emit(&self, event: OrderEvent);

    fn notify(&self, message: BrokerageMessage);
}

/// Engine-side receiver of routed market data
pub trait MarketDataSink: Send + Sync {
    fn on_tick(&self, tick: Tick);
}
