//! Order Table
//!
//! Concurrent map from brokerage order id to the engine's order. It is the
//! only registry of which brokerage orders this process owns: reconciliation
//! never infers ownership from anything but a lookup here.
//!
//! Each entry also carries the last status reconciled for that particular
//! brokerage id. An order split or replaced across several ids advances each
//! id independently, which is what makes terminal emission once-per-id.

use conduit_core::{LocalOrder, OrderId, OrderRef, OrderStatus, Quantity};
use dashmap::DashMap;
use std::collections::HashSet;

/// One tracked brokerage id
#[derive(Debug, Clone)]
pub struct TrackedOrder {
    pub order: OrderRef,
    /// Last status reconciled for this brokerage id
    pub status: OrderStatus,
    /// Absolute quantity the brokerage holds under this id. A split order's
    /// legs each carry their own share.
    pub quantity: Quantity,
}

#[derive(Debug, Default)]
pub struct OrderTable {
    entries: DashMap<String, TrackedOrder>,
}

impl OrderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; idempotent. The id covers the whole order.
    pub fn put(&self, broker_id: impl Into<String>, order: OrderRef, status: OrderStatus) {
        let quantity = order.read(LocalOrder::abs_quantity);
        self.put_leg(broker_id, order, status, quantity);
    }

    /// Insert or overwrite an id covering `quantity` of the order
    pub fn put_leg(
        &self,
        broker_id: impl Into<String>,
        order: OrderRef,
        status: OrderStatus,
        quantity: Quantity,
    ) {
        self.entries.insert(
            broker_id.into(),
            TrackedOrder {
                order,
                status,
                quantity,
            },
        );
    }

    /// Absence means "not ours (any more)", never an error
    pub fn get(&self, broker_id: &str) -> Option<TrackedOrder> {
        self.entries.get(broker_id).map(|entry| entry.value().clone())
    }

    /// Remove and return the prior value atomically
    pub fn remove(&self, broker_id: &str) -> Option<TrackedOrder> {
        self.entries.remove(broker_id).map(|(_, tracked)| tracked)
    }

    /// Record the status reconciled for `broker_id`; false if untracked
    pub fn set_status(&self, broker_id: &str, status: OrderStatus) -> bool {
        match self.entries.get_mut(broker_id) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, broker_id: &str) -> bool {
        self.entries.contains_key(broker_id)
    }

    /// Tracked brokerage ids, in no particular order
    pub fn broker_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Find the tracked handle for an engine order, if any of its ids is tracked
    pub fn find_order(&self, order_id: OrderId) -> Option<OrderRef> {
        self.entries
            .iter()
            .find(|entry| entry.value().order.id() == order_id)
            .map(|entry| entry.value().order.clone())
    }

    /// Orders currently tracked, one per engine order.
    ///
    /// Reflects each entry as it is visited; no lock is held across the
    /// whole walk.
    pub fn snapshot(&self) -> Vec<LocalOrder> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|entry| {
                let order = entry.value().order.snapshot();
                seen.insert(order.id).then_some(order)
            })
            .collect()
    }

    /// Drop every entry for which `keep` returns false, returning the removed ids
    pub fn retain(&self, mut keep: impl FnMut(&str, &TrackedOrder) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|broker_id, tracked| {
            let kept = keep(broker_id, tracked);
            if !kept {
                removed.push(broker_id.clone());
            }
            kept
        });
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
