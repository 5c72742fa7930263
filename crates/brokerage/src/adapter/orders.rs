//! Order entry and open-order refresh
//!
//! Every public call validates on the caller's task, then runs its brokerage
//! round trip and table update as one unit on the serialized mutator.

use conduit_core::{
    LocalOrder, MessageKind, OrderEvent, OrderFee, OrderId, OrderRef, OrderStatus,
    OrderValidationError,
};
use conduit_gateway::mapping::{
    classify_status, parse_order_type, parse_side, parse_time_in_force, place_request_for,
};
use conduit_gateway::{BrokerOrderRecord, PlaceOrderRequest, TransportError};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use super::{Brokerage, Inner};
use crate::error::Result;

impl Brokerage {
    /// Place `order`. Returns `Ok(false)` when the brokerage refused or could
    /// not be reached; validation problems are returned as errors.
    pub async fn place(&self, order: &OrderRef) -> Result<bool> {
        self.inner.ensure_connected()?;
        let snapshot = order.snapshot();
        snapshot.ensure_placeable()?;
        let ticker = self.inner.symbols.to_broker_ticker(&snapshot.symbol)?;
        let request = place_request_for(&snapshot, &ticker)?;

        let inner = Arc::clone(&self.inner);
        let order = order.clone();
        self.mutator
            .execute(async move { inner.place_unit(order, request).await })
            .await?
    }

    /// Resubmit `order` with its current price/quantity fields, replacing its
    /// latest brokerage id
    pub async fn modify(&self, order: &OrderRef) -> Result<bool> {
        self.inner.ensure_connected()?;
        let snapshot = order.snapshot();
        if snapshot.latest_broker_id().is_none() {
            return Err(OrderValidationError::NotPlaced(snapshot.id).into());
        }
        let ticker = self.inner.symbols.to_broker_ticker(&snapshot.symbol)?;
        let request = place_request_for(&snapshot, &ticker)?;

        let inner = Arc::clone(&self.inner);
        let order = order.clone();
        self.mutator
            .execute(async move { inner.modify_unit(order, request).await })
            .await?
    }

    /// Request cancellation of every brokerage id of `order`.
    ///
    /// `true` only if each request succeeded. Canceled events follow from the
    /// brokerage's confirmations, not from this call.
    pub async fn cancel(&self, order: &OrderRef) -> Result<bool> {
        self.inner.ensure_connected()?;
        let snapshot = order.snapshot();
        if snapshot.broker_ids.is_empty() {
            return Err(OrderValidationError::NotPlaced(snapshot.id).into());
        }

        let inner = Arc::clone(&self.inner);
        self.mutator
            .execute(async move { inner.cancel_unit(snapshot.id, snapshot.broker_ids).await })
            .await
    }

    /// Rebuild the order table from the brokerage's open orders and return
    /// one snapshot per tracked engine order
    pub async fn list_open_orders(&self) -> Result<Vec<LocalOrder>> {
        self.inner.ensure_connected()?;
        let inner = Arc::clone(&self.inner);
        self.mutator
            .execute(async move { inner.refresh_unit().await })
            .await?
    }
}

impl Inner {
    async fn place_unit(&self, order: OrderRef, request: PlaceOrderRequest) -> Result<bool> {
        let order_id = order.id();
        // A concurrent place may have won the race to the mutator
        order.read(LocalOrder::ensure_placeable)?;

        let placed = self
            .guard
            .run("place_order", self.transport.place_order(request))
            .await
            .and_then(|records| non_empty(records, "placement"));

        let records = match placed {
            Ok(records) => records,
            Err(e) => {
                warn!("Placing order {} failed: {}", order_id, e);
                self.report(
                    MessageKind::Warning,
                    "PlaceOrderFailed",
                    format!("Brokerage rejected order {order_id}: {e}"),
                );
                let rejected = order.update(|o| {
                    o.status = OrderStatus::Invalid;
                    o.clone()
                });
                let event = OrderEvent::new(
                    rejected,
                    None,
                    OrderStatus::Invalid,
                    self.clock.now(),
                    OrderFee::zero(&self.config.account_currency),
                )
                .with_message(e.to_string());
                self.events.emit(event);
                return Ok(false);
            }
        };

        let broker_ids: Vec<String> = records.iter().map(|r| r.order_id.clone()).collect();
        let submitted = order.update(|o| {
            o.broker_ids.extend(broker_ids.iter().cloned());
            o.status = OrderStatus::Submitted;
            o.clone()
        });
        for record in &records {
            self.table.put_leg(
                record.order_id.clone(),
                order.clone(),
                OrderStatus::Submitted,
                record.quantity,
            );
        }
        info!("Order {} placed as {:?}", order_id, broker_ids);

        self.events.emit(OrderEvent::new(
            submitted,
            broker_ids.first().cloned(),
            OrderStatus::Submitted,
            self.clock.now(),
            OrderFee::zero(&self.config.account_currency),
        ));
        Ok(true)
    }

    async fn modify_unit(&self, order: OrderRef, request: PlaceOrderRequest) -> Result<bool> {
        let order_id = order.id();
        let latest = order
            .read(|o| o.latest_broker_id().map(str::to_string))
            .filter(|id| self.table.contains(id))
            .ok_or(OrderValidationError::NotPlaced(order_id))?;

        let replaced = self
            .guard
            .run("replace_order", self.transport.replace_order(&latest, request))
            .await
            .and_then(|records| non_empty(records, "replacement"));

        let records = match replaced {
            Ok(records) => records,
            Err(e) => {
                warn!("Modifying order {} ({}) failed: {}", order_id, latest, e);
                self.report(
                    MessageKind::Warning,
                    "ModifyOrderFailed",
                    format!("Brokerage refused to modify order {order_id} ({latest}): {e}"),
                );
                return Ok(false);
            }
        };

        let new_ids: Vec<String> = records.iter().map(|r| r.order_id.clone()).collect();
        order.update(|o| o.broker_ids.extend(new_ids.iter().cloned()));
        for record in &records {
            self.table.put_leg(
                record.order_id.clone(),
                order.clone(),
                OrderStatus::Submitted,
                record.quantity,
            );
        }
        // The brokerage's cancellation notice for the old id is now a miss
        self.table.remove(&latest);

        info!("Order {} replaced {} with {:?}", order_id, latest, new_ids);
        Ok(true)
    }

    async fn cancel_unit(&self, order_id: OrderId, broker_ids: Vec<String>) -> bool {
        let mut all_ok = true;

        for broker_id in &broker_ids {
            match self
                .guard
                .run("cancel_order", self.transport.cancel_order(broker_id))
                .await
            {
                Ok(()) => debug!("Cancel requested for {} ({})", order_id, broker_id),
                Err(e) => {
                    all_ok = false;
                    warn!("Cancelling {} ({}) failed: {}", order_id, broker_id, e);
                    self.report(
                        MessageKind::Warning,
                        "CancelOrderFailed",
                        format!("Could not cancel order {order_id} ({broker_id}): {e}"),
                    );
                }
            }
        }

        all_ok
    }

    async fn refresh_unit(&self) -> Result<Vec<LocalOrder>> {
        let records = match self
            .guard
            .run("open_orders", self.transport.open_orders())
            .await
        {
            Ok(records) => records,
            Err(e) => {
                self.report(
                    MessageKind::Warning,
                    "OpenOrdersFailed",
                    format!("Could not fetch open orders: {e}"),
                );
                return Err(e.into());
            }
        };

        let mut reported = HashSet::with_capacity(records.len());
        for record in &records {
            // Kept even when unreadable so a tracked id is not dropped for it
            reported.insert(record.order_id.clone());

            if let Err(e) = self.adopt(record) {
                error!("Skipping open order {}: {}", record.order_id, e);
                self.report(
                    MessageKind::Error,
                    "OpenOrderSkipped",
                    format!("Could not interpret open order {}: {e}", record.order_id),
                );
            }
        }

        let gone = self.table.retain(|broker_id, _| reported.contains(broker_id));
        for broker_id in gone {
            warn!("{} no longer open at the brokerage; untracked", broker_id);
            self.report(
                MessageKind::Warning,
                "OrderNoLongerOpen",
                format!("Brokerage order {broker_id} is no longer open and is no longer tracked"),
            );
        }

        Ok(self.table.snapshot())
    }

    /// Track an open brokerage order, creating an engine order for ones
    /// placed outside this process
    fn adopt(&self, record: &BrokerOrderRecord) -> Result<()> {
        let status = classify_status(&record.status)?;
        if self.table.contains(&record.order_id) {
            return Ok(());
        }
        if status.is_terminal() {
            debug!("Open-order listing reported {} as {:?}", record.order_id, status);
            return Ok(());
        }

        let side = parse_side(&record.side)?;
        let order_type = parse_order_type(&record.order_type)?;
        let symbol = self.symbols.to_local(&record.ticker)?;

        let mut order = LocalOrder::new_with_time(
            symbol,
            side.signed(record.quantity),
            order_type,
            record.limit_price,
            record.stop_price,
            parse_time_in_force(&record.time_in_force),
            record.created_at,
        );
        order.broker_ids.push(record.order_id.clone());
        order.status = status;

        info!(
            "Adopting brokerage order {} as {} ({:?})",
            record.order_id, order.id, status
        );
        self.table.put_leg(
            record.order_id.clone(),
            OrderRef::new(order),
            status,
            record.quantity,
        );
        Ok(())
    }
}

fn non_empty(
    records: Vec<BrokerOrderRecord>,
    operation: &str,
) -> std::result::Result<Vec<BrokerOrderRecord>, TransportError> {
    if records.is_empty() {
        Err(TransportError::Decode(format!(
            "{operation} returned no brokerage order ids"
        )))
    } else {
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{adapter, order_events};
    use super::*;
    use crate::error::Error;
    use crate::sink::EngineEvent;
    use chrono::Utc;
    use conduit_core::TimeInForce;
    use conduit_gateway::{BrokerOrderStatus, BrokerSide, BrokerTimeInForce};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_place_tracks_every_returned_id() {
        let mut h = adapter().await;
        h.sim.split_next_place(3);
        let order = OrderRef::new(LocalOrder::limit("AAPL", dec!(10), dec!(100)));

        assert_eq!(h.brokerage.place(&order).await, Ok(true));

        let ids = order.read(|o| o.broker_ids.clone());
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| h.brokerage.is_tracked(id)));
        assert_eq!(order.status(), OrderStatus::Submitted);

        // Pending notices for the new ids are duplicates of Submitted
        h.brokerage.settle().await.unwrap();
        let events = order_events(&mut h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, OrderStatus::Submitted);
    }

    #[tokio::test]
    async fn test_place_validation_errors_reach_caller() {
        let h = adapter().await;

        let zero = OrderRef::new(LocalOrder::market("AAPL", dec!(0)));
        assert_eq!(
            h.brokerage.place(&zero).await,
            Err(Error::Validation(OrderValidationError::ZeroQuantity))
        );

        let mut gtd = LocalOrder::limit("AAPL", dec!(1), dec!(100));
        gtd.time_in_force = TimeInForce::GoodTilDate(Utc::now());
        assert!(matches!(
            h.brokerage.place(&OrderRef::new(gtd)).await,
            Err(Error::Validation(OrderValidationError::UnsupportedTimeInForce(_)))
        ));

        let unknown = OrderRef::new(LocalOrder::market("TSLA", dec!(1)));
        assert!(matches!(
            h.brokerage.place(&unknown).await,
            Err(Error::Symbol(_))
        ));
        assert_eq!(h.sim.order_count(), 0);
    }

    #[tokio::test]
    async fn test_place_twice_rejected() {
        let h = adapter().await;
        let order = OrderRef::new(LocalOrder::market("AAPL", dec!(5)));

        assert_eq!(h.brokerage.place(&order).await, Ok(true));
        assert!(matches!(
            h.brokerage.place(&order).await,
            Err(Error::Validation(OrderValidationError::AlreadyPlaced(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_place_emits_invalid() {
        let mut h = adapter().await;
        h.sim.fail_next_place(TransportError::api(503, "maintenance"));
        let order = OrderRef::new(LocalOrder::market("AAPL", dec!(5)));

        assert_eq!(h.brokerage.place(&order).await, Ok(false));
        assert_eq!(order.status(), OrderStatus::Invalid);

        let mut saw_warning = false;
        let mut saw_invalid = false;
        while let Ok(event) = h.events.try_recv() {
            match event {
                EngineEvent::Message(m) if m.code == "PlaceOrderFailed" => saw_warning = true,
                EngineEvent::Order(e) if e.status == OrderStatus::Invalid => saw_invalid = true,
                _ => {}
            }
        }
        assert!(saw_warning && saw_invalid);
        assert!(h.brokerage.tracked_ids().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_calls_fail() {
        let h = adapter().await;
        h.brokerage.disconnect().await;
        let order = OrderRef::new(LocalOrder::market("AAPL", dec!(5)));

        assert_eq!(h.brokerage.place(&order).await, Err(Error::NotConnected));
        assert!(matches!(
            h.brokerage.list_open_orders().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_modify_unplaced_order() {
        let h = adapter().await;
        let order = OrderRef::new(LocalOrder::limit("AAPL", dec!(5), dec!(10)));
        assert!(matches!(
            h.brokerage.modify(&order).await,
            Err(Error::Validation(OrderValidationError::NotPlaced(_)))
        ));
        assert!(matches!(
            h.brokerage.cancel(&order).await,
            Err(Error::Validation(OrderValidationError::NotPlaced(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_adopts_foreign_and_drops_vanished() {
        let mut h = adapter().await;
        let ours = OrderRef::new(LocalOrder::limit("AAPL", dec!(10), dec!(100)));
        h.brokerage.place(&ours).await.unwrap();
        let our_id = ours.read(|o| o.broker_ids[0].clone());

        let stale = OrderRef::new(LocalOrder::limit("AAPL", dec!(1), dec!(90)));
        h.brokerage.place(&stale).await.unwrap();
        let stale_id = stale.read(|o| o.broker_ids[0].clone());
        h.brokerage.settle().await.unwrap();

        // Placed from another session, and cancelled without a notice reaching us
        let mut foreign = record("EXT-1");
        foreign.ticker = "MSFT.US".to_string();
        foreign.side = BrokerSide::Sell.as_str().to_string();
        foreign.time_in_force = BrokerTimeInForce::Day.as_str().to_string();
        h.sim.insert_record(foreign);
        h.sim
            .set_status_silently(&stale_id, BrokerOrderStatus::Cancelled)
            .unwrap();

        let open = h.brokerage.list_open_orders().await.unwrap();

        assert_eq!(open.len(), 2);
        assert!(h.brokerage.is_tracked(&our_id));
        assert!(!h.brokerage.is_tracked(&stale_id));
        let adopted = h.brokerage.tracked_order("EXT-1").unwrap().snapshot();
        assert_eq!(adopted.symbol, "MSFT");
        assert_eq!(adopted.quantity, dec!(-2));
        assert_eq!(adopted.status, OrderStatus::PartiallyFilled);
        assert_eq!(adopted.time_in_force, TimeInForce::Day);
        assert_eq!(adopted.broker_ids, vec!["EXT-1".to_string()]);

        let codes: Vec<String> = std::iter::from_fn(|| h.events.try_recv().ok())
            .filter_map(|e| match e {
                EngineEvent::Message(m) => Some(m.code),
                _ => None,
            })
            .collect();
        assert!(codes.contains(&"OrderNoLongerOpen".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_skips_unreadable_records() {
        let mut h = adapter().await;
        h.sim.insert_record(BrokerOrderRecord {
            status: "suspended".to_string(),
            ..record("SIM-X")
        });
        h.sim.insert_record(record("SIM-Y"));

        let open = h.brokerage.list_open_orders().await.unwrap();

        assert_eq!(open.len(), 1);
        assert!(h.brokerage.is_tracked("SIM-Y"));
        assert!(!h.brokerage.is_tracked("SIM-X"));
        let skipped = std::iter::from_fn(|| h.events.try_recv().ok()).any(|e| {
            matches!(e, EngineEvent::Message(m) if m.code == "OpenOrderSkipped")
        });
        assert!(skipped);
    }

    fn record(order_id: &str) -> BrokerOrderRecord {
        let request = PlaceOrderRequest::limit(
            "external",
            "AAPL.US",
            BrokerSide::Buy,
            dec!(2),
            dec!(99),
            BrokerTimeInForce::Gtc,
        );
        BrokerOrderRecord::accepted(order_id, &request, "working", Utc::now())
    }
}
