//! Scripted Session - a full order lifecycle over the simulated brokerage
//!
//! For every configured symbol:
//! - subscribe and stream one quote and one trade
//! - place a limit order, work it half way, post a commission, fill it
//! - place a second order and cancel it
//!
//! Then refresh open orders, read the account and disconnect. Everything the
//! adapter reported along the way is tallied into [`SessionResults`].

use chrono::Utc;
use conduit_brokerage::{EngineEvent, Error, Result};
use conduit_core::{Holding, LocalOrder, OrderRef, OrderStatus, OrderValidationError};
use conduit_gateway::{QuoteMessage, TradeMessage};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::bootstrap::SessionBootstrap;

#[derive(Debug, Clone, Default)]
pub struct SessionResults {
    /// Orders the brokerage accepted
    pub orders_placed: u64,
    /// Order events received, by status
    pub events_by_status: HashMap<OrderStatus, u64>,
    /// Sum of fees attached to fill events
    pub total_fees: Decimal,
    /// Market data ticks routed to the engine
    pub ticks: u64,
    /// Codes of every brokerage message, in arrival order
    pub messages: Vec<String>,
    /// Orders still tracked after the final refresh
    pub open_orders: usize,
    pub holdings: Vec<Holding>,
    /// Whether the script ran to the end
    pub success: bool,
    pub error: Option<String>,
}

impl SessionResults {
    pub fn events(&self, status: OrderStatus) -> u64 {
        self.events_by_status.get(&status).copied().unwrap_or(0)
    }

    fn record(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Order(e) => {
                if e.status == OrderStatus::Filled {
                    self.total_fees += e.fee.amount;
                }
                *self.events_by_status.entry(e.status).or_insert(0) += 1;
            }
            EngineEvent::Message(m) => self.messages.push(m.code),
            EngineEvent::Tick(_) => self.ticks += 1,
        }
    }
}

pub struct ScriptedSession {
    bootstrap: SessionBootstrap,
    results: SessionResults,
}

impl ScriptedSession {
    pub fn new(bootstrap: SessionBootstrap) -> Self {
        Self {
            bootstrap,
            results: SessionResults::default(),
        }
    }

    /// Run the script to completion; failures end up in the results
    pub async fn run(mut self) -> SessionResults {
        log::info!("Starting scripted session...");

        let outcome = self.drive().await;
        self.bootstrap.brokerage.disconnect().await;
        self.collect();

        match outcome {
            Ok(()) => self.results.success = true,
            Err(e) => {
                log::error!("Scripted session failed: {}", e);
                self.results.error = Some(e.to_string());
            }
        }

        log::info!(
            "Session finished: {} orders placed, {} filled, {} canceled, fees {}",
            self.results.orders_placed,
            self.results.events(OrderStatus::Filled),
            self.results.events(OrderStatus::Canceled),
            self.results.total_fees
        );
        self.results
    }

    async fn drive(&mut self) -> Result<()> {
        let brokerage = self.bootstrap.brokerage.clone();
        brokerage.connect().await?;

        for mapping in self.bootstrap.config.symbols.clone() {
            brokerage.subscribe(&mapping.symbol).await?;
            self.stream_market_data(&mapping.ticker);

            let filled = self.place_limit(&mapping.symbol).await?;
            let broker_id = first_broker_id(&filled)?;
            let session = &self.bootstrap.config.session;
            let half = (session.quantity.abs() / Decimal::TWO).trunc();
            self.bootstrap.simulator.work(&broker_id, half)?;
            self.bootstrap.simulator.add_fee(
                &broker_id,
                session.commission,
                &self.bootstrap.config.brokerage.account_currency,
            );
            self.bootstrap
                .simulator
                .fill(&broker_id, session.limit_price)?;

            let resting = self.place_limit(&mapping.symbol).await?;
            if !brokerage.cancel(&resting).await? {
                log::warn!("Cancel of resting {} order was refused", mapping.symbol);
            }

            brokerage.settle().await?;
            brokerage.unsubscribe(&mapping.symbol).await?;
            self.collect();
        }

        self.results.open_orders = brokerage.list_open_orders().await?.len();
        self.results.holdings = brokerage.list_holdings().await?;
        Ok(())
    }

    async fn place_limit(&mut self, symbol: &str) -> Result<OrderRef> {
        let session = &self.bootstrap.config.session;
        let order = OrderRef::new(LocalOrder::limit(
            symbol,
            session.quantity,
            session.limit_price,
        ));

        if self.bootstrap.brokerage.place(&order).await? {
            self.results.orders_placed += 1;
        }
        Ok(order)
    }

    fn stream_market_data(&self, ticker: &str) {
        let price = self.bootstrap.config.session.limit_price;
        let now = Utc::now();
        let simulator = &self.bootstrap.simulator;

        simulator.emit_quote(QuoteMessage::new(
            ticker,
            (price - Decimal::ONE, Decimal::ONE_HUNDRED),
            (price + Decimal::ONE, Decimal::ONE_HUNDRED),
            now,
        ));
        simulator.emit_trade(TradeMessage::new(ticker, price, Decimal::TEN, now));
    }

    /// Move everything reported so far into the results
    fn collect(&mut self) {
        while let Ok(event) = self.bootstrap.events.try_recv() {
            self.results.record(event);
        }
    }
}

fn first_broker_id(order: &OrderRef) -> Result<String> {
    order
        .read(|o| o.broker_ids.first().cloned())
        .ok_or_else(|| Error::Validation(OrderValidationError::NotPlaced(order.id())))
}
