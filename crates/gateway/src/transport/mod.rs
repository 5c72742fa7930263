//! Transport abstraction layer
//!
//! Port traits for the brokerage's request/response API and its push streams.
//! Implementations: [`crate::SimulatedBrokerage`] in-process; a REST/websocket
//! client for a live account plugs in behind the same traits.

pub mod channel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::TransportResult;
use crate::messages::{
    BrokerCandle, BrokerCash, BrokerOrderRecord, BrokerPosition, CandleRequest,
    OrderUpdateMessage, PlaceOrderRequest, QuoteMessage, TradeMessage, Transaction,
};

/// Receives pushed order updates; invoked on the transport's receive path
pub type OrderUpdateCallback = Arc<dyn Fn(OrderUpdateMessage) + Send + Sync>;

/// Receives streamed quotes for one ticker
pub type QuoteCallback = Arc<dyn Fn(QuoteMessage) + Send + Sync>;

/// Receives streamed trades for one ticker
pub type TradeCallback = Arc<dyn Fn(TradeMessage) + Send + Sync>;

/// Brokerage request/response API plus the order-update push subscription
#[async_trait]
pub trait BrokerageTransport: Send + Sync {
    /// Place an order; the brokerage may split it and return several records
    async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> TransportResult<Vec<BrokerOrderRecord>>;

    /// Replace a working order; the brokerage issues new ids
    async fn replace_order(
        &self,
        order_id: &str,
        request: PlaceOrderRequest,
    ) -> TransportResult<Vec<BrokerOrderRecord>>;

    async fn cancel_order(&self, order_id: &str) -> TransportResult<()>;

    async fn open_orders(&self) -> TransportResult<Vec<BrokerOrderRecord>>;

    /// Ledger postings for an order; may be empty while postings settle
    async fn transactions(&self, order_id: &str) -> TransportResult<Vec<Transaction>>;

    async fn positions(&self) -> TransportResult<Vec<BrokerPosition>>;

    async fn cash_balances(&self) -> TransportResult<Vec<BrokerCash>>;

    async fn candles(&self, request: CandleRequest) -> TransportResult<Vec<BrokerCandle>>;

    /// Start delivering order updates to `callback`, replacing any previous one
    async fn register_order_updates(&self, callback: OrderUpdateCallback) -> TransportResult<()>;

    /// Stop delivering order updates
    async fn clear_order_updates(&self);
}

/// Which market-data stream a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Quote,
    Trade,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Quote => f.write_str("quote"),
            StreamKind::Trade => f.write_str("trade"),
        }
    }
}

/// Opaque handle to an open market-data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle {
    pub id: u64,
    pub kind: StreamKind,
}

/// Per-ticker market-data streams
#[async_trait]
pub trait MarketDataStreams: Send + Sync {
    async fn open_quote_stream(
        &self,
        ticker: &str,
        callback: QuoteCallback,
    ) -> TransportResult<StreamHandle>;

    async fn open_trade_stream(
        &self,
        ticker: &str,
        callback: TradeCallback,
    ) -> TransportResult<StreamHandle>;

    /// Close a stream; closing an unknown handle is a no-op
    async fn close_stream(&self, handle: StreamHandle) -> TransportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure traits are object-safe
    fn _assert_transport_object_safe(_: &dyn BrokerageTransport) {}
    fn _assert_streams_object_safe(_: &dyn MarketDataStreams) {}
}
