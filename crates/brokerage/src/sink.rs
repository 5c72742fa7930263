use conduit_core::{BrokerageMessage, OrderEvent, Tick};
use conduit_ports::{MarketDataSink, OrderEventSink};
use log::trace;
use tokio::sync::mpsc;

/// Everything the adapter hands to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Order(OrderEvent),
    Message(BrokerageMessage),
    Tick(Tick),
}

/// Engine sink forwarding onto an unbounded channel.
///
/// Never blocks; once the receiver is gone events are dropped.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            trace!("Engine receiver dropped; discarding event");
        }
    }
}

impl OrderEventSink for ChannelSink {
    fn emit(&self, event: OrderEvent) {
        self.forward(EngineEvent::Order(event));
    }

    fn notify(&self, message: BrokerageMessage) {
        self.forward(EngineEvent::Message(message));
    }
}

impl MarketDataSink for ChannelSink {
    fn on_tick(&self, tick: Tick) {
        self.forward(EngineEvent::Tick(tick));
    }
}
