//! Lifecycle transition history.
//!
//! Every state change the controller makes is recorded as a
//! [`LifecycleEvent`]. The log is bounded; the oldest events are dropped once
//! the limit is reached.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::clock::Timestamp;
use crate::lifecycle::LifecycleState;
use crate::model::{ActorId, ReportId};

/// A single state transition of one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub report_id: ReportId,
    pub from: LifecycleState,
    pub to: LifecycleState,
    /// Actor whose action caused the transition, `None` for timer-driven ones
    pub actor: Option<ActorId>,
    pub at: Timestamp,
}

impl LifecycleEvent {
    /// Get a human-readable description of this event
    pub fn description(&self) -> String {
        match (&self.to, &self.actor) {
            (LifecycleState::Editing { holder }, _) => {
                format!("{} started editing {}", holder, self.report_id)
            }
            (LifecycleState::Finalized, Some(actor)) => {
                format!("{} finalized {}", actor, self.report_id)
            }
            (LifecycleState::AutoConfirmed, _) => {
                format!("{} auto-confirmed", self.report_id)
            }
            (LifecycleState::AiPendingReview, Some(actor)) => {
                format!("{} stopped editing {}", actor, self.report_id)
            }
            (to, _) => format!("{} moved to {}", self.report_id, to.name()),
        }
    }
}

/// Bounded log of lifecycle events, oldest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<LifecycleEvent>,
    max_history: usize,
}

impl EventLog {
    /// Create a log keeping at most `max_history` events.
    pub fn with_limit(max_history: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_history,
        }
    }

    /// Record an event, evicting the oldest if the log is full.
    pub fn push(&mut self, event: LifecycleEvent) {
        log::debug!("📝 History: {}", event.description());
        self.events.push_back(event);

        // Limit history size
        while self.events.len() > self.max_history {
            self.events.pop_front();
        }
    }

    /// All retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LifecycleEvent> {
        self.events.iter()
    }

    /// Retained events for one report, oldest first.
    pub fn for_report<'a>(
        &'a self,
        report_id: &'a ReportId,
    ) -> impl Iterator<Item = &'a LifecycleEvent> + 'a {
        self.events.iter().filter(move |e| &e.report_id == report_id)
    }

    /// Most recent event.
    pub fn last(&self) -> Option<&LifecycleEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.events.clear();
        log::debug!("🗑️ History cleared");
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_limit(crate::config::DEFAULT_HISTORY_LIMIT)
    }
}
