//! Reconciliation State Machine
//!
//! Maps each pushed brokerage order update onto the owning engine order and
//! emits at most one domain event per meaningful transition.
//!
//! Per brokerage id:
//!
//! ```text
//! Submitted ──► PartiallyFilled* ──► { Filled, Canceled, Invalid }
//! ```
//!
//! Processing one update:
//! 1. look the id up in the order table; a miss is a silent no-op
//! 2. classify the brokerage status; unknown codes are errors
//! 3. drop the update unless it advances this id's status
//! 4. on Filled, resolve the fee (zero if postings have not settled)
//! 5. apply the transition to the engine order
//! 6. stop tracking the id once it is terminal
//! 7. emit the event
//!
//! Every call runs inside the serialized mutator, so step 6 is visible to the
//! next update for the same id.

use conduit_core::{BrokerageMessage, OrderEvent, OrderFee, OrderStatus};
use conduit_gateway::{OrderUpdateMessage, mapping::classify_status};
use conduit_ports::{Clock, OrderEventSink};
use log::{debug, error, info};
use std::sync::Arc;

use crate::error::Result;
use crate::fees::FeeResolver;
use crate::order_table::OrderTable;

/// What happened to one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The id is not (or no longer) tracked
    Untracked,
    /// The update repeats or regresses the id's current status
    Stale(OrderStatus),
    /// An event was emitted with this status
    Emitted(OrderStatus),
}

pub struct Reconciler {
    table: Arc<OrderTable>,
    fees: FeeResolver,
    events: Arc<dyn OrderEventSink>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        table: Arc<OrderTable>,
        fees: FeeResolver,
        events: Arc<dyn OrderEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table,
            fees,
            events,
            clock,
        }
    }

    /// Reconcile one update. Must be called from inside the serialized mutator.
    pub async fn process(&self, update: &OrderUpdateMessage) -> Result<Outcome> {
        let Some(tracked) = self.table.get(&update.order_id) else {
            debug!(
                "Ignoring {} update for untracked order {}",
                update.status, update.order_id
            );
            return Ok(Outcome::Untracked);
        };

        let status = classify_status(&update.status)?;
        if !tracked.status.can_advance_to(status) {
            debug!(
                "Ignoring {:?} for {}: already {:?}",
                status, update.order_id, tracked.status
            );
            return Ok(Outcome::Stale(status));
        }

        let fee = if status == OrderStatus::Filled {
            self.fees.resolve(&update.order_id).await
        } else {
            OrderFee::zero(self.fees.currency())
        };

        let order = tracked.order.update(|order| {
            if order.status.can_advance_to(status) {
                order.status = status;
            }
            order.clone()
        });

        let mut event = OrderEvent::new(
            order,
            Some(update.order_id.clone()),
            status,
            self.clock.now(),
            fee,
        );
        if status == OrderStatus::Filled {
            // Without a reported quantity, this id's own share was filled
            let filled = update.filled_quantity.unwrap_or(tracked.quantity);
            let signed = event.order.side().signed(filled);
            event = event.with_fill(signed, update.avg_fill_price);
        }

        if status.is_terminal() {
            self.table.remove(&update.order_id);
        } else {
            self.table.set_status(&update.order_id, status);
        }

        info!(
            "Order {} ({}) -> {:?}",
            event.order_id, update.order_id, status
        );
        self.events.emit(event);
        Ok(Outcome::Emitted(status))
    }

    /// Reconcile one update, reporting failures to the engine instead of a caller
    pub async fn handle(&self, update: OrderUpdateMessage) {
        if let Err(e) = self.process(&update).await {
            error!(
                "Failed to reconcile {} update for {}: {}",
                update.status, update.order_id, e
            );
            self.events.notify(BrokerageMessage::error(
                "ReconciliationFailed",
                format!(
                    "Could not reconcile update {:?} for brokerage order {}: {}",
                    update.status, update.order_id, e
                ),
            ));
        }
    }
}
