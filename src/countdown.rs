//! Auto-confirm countdown.
//!
//! A countdown records when it started and derives the remaining time from the
//! clock on every tick, so ticking late or rarely never causes drift.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::{Result, ReviewError};

/// Snapshot of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    /// Always equal to `remaining_seconds == 0`
    pub expired: bool,
}

impl CountdownState {
    fn new(remaining_seconds: u32, total_seconds: u32) -> Self {
        Self {
            remaining_seconds,
            total_seconds,
            expired: remaining_seconds == 0,
        }
    }

    /// Urgency tier for the remaining fraction of time.
    pub fn urgency(&self) -> Urgency {
        Urgency::from_fraction(self.remaining_seconds, self.total_seconds)
    }
}

/// How close a countdown is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// More than half of the time is left
    Normal,
    /// At most half of the time is left
    Warning,
    /// At most a fifth of the time is left
    Critical,
}

impl Urgency {
    /// Classify `remaining / total`.
    ///
    /// Boundaries belong to the more urgent tier: exactly 0.50 is a warning and
    /// exactly 0.20 is critical. Integer arithmetic keeps the boundaries exact.
    pub fn from_fraction(remaining: u32, total: u32) -> Self {
        let remaining = u64::from(remaining);
        let total = u64::from(total);
        if remaining * 5 <= total {
            Urgency::Critical
        } else if remaining * 2 <= total {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    /// Get the display name for this tier.
    pub fn name(&self) -> &'static str {
        match self {
            Urgency::Normal => "Normal",
            Urgency::Warning => "Warning",
            Urgency::Critical => "Critical",
        }
    }
}

/// A running auto-confirm countdown for one report.
#[derive(Debug, Clone)]
pub struct Countdown {
    total_seconds: u32,
    started_at: Timestamp,
    remaining_seconds: u32,
    /// Frozen countdowns ignore further ticks.
    frozen: bool,
    /// Set by the tick that reaches zero, cleared by `take_expiry`.
    expiry_pending: bool,
}

impl Countdown {
    /// Start a countdown of `total_seconds` at `now`.
    pub fn start(total_seconds: u32, now: Timestamp) -> Result<Self> {
        if total_seconds == 0 {
            return Err(ReviewError::InvalidDuration {
                seconds: total_seconds,
            });
        }
        log::trace!("Countdown: started {}s at {}", total_seconds, now);
        Ok(Self {
            total_seconds,
            started_at: now,
            remaining_seconds: total_seconds,
            frozen: false,
            expiry_pending: false,
        })
    }

    /// Recompute the remaining time from the elapsed wall time.
    ///
    /// Remaining time never increases, even if the clock jumps backwards.
    pub fn tick(&mut self, now: Timestamp) -> CountdownState {
        if self.frozen || self.remaining_seconds == 0 {
            return self.state();
        }

        let elapsed = now.saturating_duration_since(self.started_at).as_secs();
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let remaining = self.total_seconds.saturating_sub(elapsed);
        self.remaining_seconds = remaining.min(self.remaining_seconds);

        if self.remaining_seconds == 0 {
            log::debug!("⏰ Countdown expired after {}s", self.total_seconds);
            self.expiry_pending = true;
        }
        self.state()
    }

    /// Current state without consulting the clock.
    pub fn state(&self) -> CountdownState {
        CountdownState::new(self.remaining_seconds, self.total_seconds)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn urgency(&self) -> Urgency {
        self.state().urgency()
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Stop reacting to ticks; the current state is kept as-is.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.expiry_pending = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Consume the expiry event.
    ///
    /// Returns `true` exactly once, after the tick that reached zero.
    pub fn take_expiry(&mut self) -> bool {
        std::mem::take(&mut self.expiry_pending)
    }
}
