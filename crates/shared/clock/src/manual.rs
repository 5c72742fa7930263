use chrono::{Duration, Utc};
use conduit_core::Timestamp;
use conduit_ports::Clock;
use parking_lot::RwLock;
use std::sync::Arc;

/// Clock that only moves when told to
///
/// Cloned handles share the same time, so a test can keep one handle while
/// the adapter stamps events through another.
#[derive(Clone)]
pub struct ManualClock {
    current: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Freeze at the current wall-clock time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(time: Timestamp) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    pub fn set(&self, time: Timestamp) {
        *self.current.write() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write();
        *current += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
