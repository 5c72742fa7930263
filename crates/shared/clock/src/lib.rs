//! Conduit Clock Infrastructure
//!
//! Time sources for event timestamps:
//!
//! ```text
//! SystemClock   wall-clock time, used by live sessions
//! ManualClock   frozen time, moved only by set()/advance(), used by tests
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use conduit_clock::{Clock, ManualClock};
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_at(start);
//! clock.advance(Duration::minutes(5));
//! assert_eq!(clock.now(), start + Duration::minutes(5));
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use conduit_ports::Clock;
