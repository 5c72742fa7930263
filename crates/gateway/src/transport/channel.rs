//! Order-update ingestion channel
//!
//! Unbounded FIFO between the transport's receive path (sole producer) and the
//! reconciliation consumer. Pushing never blocks, so network deserialisation
//! is never stalled by reconciliation work.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Counters shared by both ends of the channel.
///
/// `forwarded` is bumped by the consumer once it has handed a message on, so
/// `in_flight() == 0` means every pushed message has left the channel and its
/// follow-up work is already queued downstream.
#[derive(Debug, Default)]
pub struct IngestionStats {
    pushed: AtomicU64,
    forwarded: AtomicU64,
}

impl IngestionStats {
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Acquire)
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> u64 {
        self.pushed().saturating_sub(self.forwarded())
    }
}

/// Producer end, cheap to clone into transport callbacks
pub struct IngestionSender<M> {
    tx: mpsc::UnboundedSender<M>,
    stats: Arc<IngestionStats>,
}

impl<M> Clone for IngestionSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<M> IngestionSender<M> {
    /// Enqueue without blocking
    pub fn push(&self, msg: M) -> Result<(), TransportError> {
        // Count first so a fast consumer can never observe forwarded > pushed
        self.stats.pushed.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(msg).is_err() {
            self.stats.pushed.fetch_sub(1, Ordering::AcqRel);
            return Err(TransportError::ChannelClosed);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn stats(&self) -> Arc<IngestionStats> {
        Arc::clone(&self.stats)
    }
}

/// Consumer end
pub struct IngestionReceiver<M> {
    rx: mpsc::UnboundedReceiver<M>,
    stats: Arc<IngestionStats>,
}

impl<M> IngestionReceiver<M> {
    /// Wait for the next message; `None` once every sender is gone
    pub async fn next(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    /// Try to receive without waiting
    pub fn try_next(&mut self) -> Result<Option<M>, TransportError> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(TransportError::ChannelClosed),
        }
    }

    /// Record that a received message has been handed to its processor
    pub fn mark_forwarded(&self) {
        self.stats.forwarded.fetch_add(1, Ordering::AcqRel);
    }

    pub fn stats(&self) -> Arc<IngestionStats> {
        Arc::clone(&self.stats)
    }
}

/// Create a connected sender/receiver pair
pub fn ingestion_channel<M>() -> (IngestionSender<M>, IngestionReceiver<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(IngestionStats::default());
    (
        IngestionSender {
            tx,
            stats: Arc::clone(&stats),
        },
        IngestionReceiver { rx, stats },
    )
}
