//! Serialized Mutator
//!
//! Exclusive-execution queue for everything that touches brokerage order
//! state: public mutating calls (place, modify, cancel, open-order refresh)
//! and the reconciliation of each dequeued order update.
//!
//! ```text
//!  trading callers ──execute()──┐
//!                               ├──► unbounded FIFO ──► actor task ──► unit, unit, unit ...
//!  ingestion consumer ─submit()─┘                        (one at a time)
//! ```
//!
//! Submission never blocks. Units from a single producer run in submission
//! order; a unit runs to completion before the next one starts. Each unit runs
//! in its own task so a panic ends that unit only and the actor carries on.

use log::{debug, error, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

type Unit = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time mutator statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutatorStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
}

impl MutatorStats {
    /// Units submitted but not yet finished
    pub fn queued(&self) -> u64 {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}

/// Handle for submitting units, cheap to clone
#[derive(Clone)]
pub struct MutatorHandle {
    sender: mpsc::UnboundedSender<Unit>,
    counters: Arc<Counters>,
}

impl MutatorHandle {
    /// Queue a fire-and-forget unit
    pub fn submit<F>(&self, unit: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.counters.submitted.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(Box::pin(unit)).is_err() {
            self.counters.submitted.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::MutatorClosed);
        }
        Ok(())
    }

    /// Queue a unit and wait for its output
    pub async fn execute<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(async move {
            let output = work.await;
            let _ = reply_tx.send(output);
        })?;

        // A dropped reply means the unit panicked or the actor went away
        reply_rx.await.map_err(|_| Error::UnitAborted)
    }

    /// Wait until every unit queued before this call has finished
    pub async fn flush(&self) -> Result<()> {
        self.execute(async {}).await
    }

    pub fn stats(&self) -> MutatorStats {
        MutatorStats {
            submitted: self.counters.submitted.load(Ordering::Acquire),
            completed: self.counters.completed.load(Ordering::Acquire),
            failed: self.counters.failed.load(Ordering::Acquire),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The actor owning the queue
pub struct SerializedMutator {
    receiver: mpsc::UnboundedReceiver<Unit>,
    counters: Arc<Counters>,
}

impl SerializedMutator {
    /// Start the actor and return its handle
    pub fn spawn() -> (MutatorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let handle = MutatorHandle {
            sender,
            counters: Arc::clone(&counters),
        };
        let mutator = SerializedMutator { receiver, counters };

        (handle, tokio::spawn(mutator.run()))
    }

    /// Main loop - runs units strictly one after another
    async fn run(mut self) {
        info!("Serialized mutator started");

        while let Some(unit) = self.receiver.recv().await {
            match tokio::spawn(unit).await {
                Ok(()) => {
                    self.counters.completed.fetch_add(1, Ordering::AcqRel);
                }
                Err(e) if e.is_panic() => {
                    self.counters.failed.fetch_add(1, Ordering::AcqRel);
                    error!("Serialized unit panicked; continuing with next unit");
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::AcqRel);
                    warn!("Serialized unit did not complete: {}", e);
                }
            }
        }

        debug!("All mutator handles dropped");
        info!("Serialized mutator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_units_run_in_submission_order() {
        let (handle, _task) = SerializedMutator::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10u64 {
            let log = Arc::clone(&log);
            handle
                .submit(async move {
                    // Earlier units sleep longer; order must still hold
                    tokio::time::sleep(Duration::from_millis(10 - i)).await;
                    log.lock().push(i);
                })
                .unwrap();
        }
        handle.flush().await.unwrap();

        assert_eq!(*log.lock(), (0..10u64).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_units_never_overlap() {
        let (handle, _task) = SerializedMutator::spawn();
        let active = Arc::new(AtomicU64::new(0));
        let overlaps = Arc::new(AtomicU64::new(0));

        let mut waiters = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            let active = Arc::clone(&active);
            let overlaps = Arc::clone(&overlaps);
            waiters.push(tokio::spawn(async move {
                handle
                    .execute(async move {
                        if active.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        handle.flush().await.unwrap();
        assert!(handle.stats().completed >= 8);
    }

    #[tokio::test]
    async fn test_execute_returns_output() {
        let (handle, _task) = SerializedMutator::spawn();
        let answer = handle.execute(async { 6 * 7 }).await.unwrap();
        assert_eq!(answer, 42);
    }

    #[tokio::test]
    async fn test_panicking_unit_does_not_poison_queue() {
        let (handle, _task) = SerializedMutator::spawn();

        let failed: Result<()> = handle.execute(async { panic!("boom") }).await;
        assert_eq!(failed, Err(Error::UnitAborted));

        let after = handle.execute(async { "still running" }).await.unwrap();
        assert_eq!(after, "still running");

        // Counters for a unit settle before the next unit starts
        handle.flush().await.unwrap();
        let stats = handle.stats();
        assert_eq!(stats.failed, 1);
        assert!(stats.completed >= 1);
        assert!(stats.queued() <= 1);
    }

    #[tokio::test]
    async fn test_submit_after_actor_stopped() {
        let (handle, task) = SerializedMutator::spawn();
        task.abort();
        let _ = task.await;

        assert!(handle.is_closed());
        assert_eq!(handle.submit(async {}), Err(Error::MutatorClosed));
    }
}
