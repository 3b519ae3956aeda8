//! Time sources for countdowns and record timestamps.
//!
//! Countdowns never count ticks. They record the timestamp they started at and
//! recompute the remaining time from the clock, so a suspended process (or a
//! throttled browser tab) catches up on the next tick. Tests use
//! [`ManualClock`] to move virtual time without sleeping.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use web_time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp moved forward by `duration`.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the current time.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
///
/// Uses `web_time` so the same code reads `Date.now()` on wasm targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Manually advanced clock for deterministic tests and replays.
///
/// Clones share the same virtual time, so a test can keep one handle and hand
/// another to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    /// Create a clock starting at the given timestamp.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move virtual time forward.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get().saturating_add(duration));
    }

    /// Move virtual time forward by whole seconds.
    pub fn advance_secs(&self, seconds: u64) {
        self.advance(Duration::from_secs(seconds));
    }

    /// Jump to an absolute timestamp (may move backwards).
    pub fn set(&self, timestamp: Timestamp) {
        self.now.set(timestamp);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}
