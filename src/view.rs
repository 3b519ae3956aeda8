//! Read models handed to the presentation layer.

use serde::Serialize;

use crate::clock::Timestamp;
use crate::countdown::{CountdownState, Urgency};
use crate::lifecycle::LifecycleState;
use crate::lock::EditLock;
use crate::model::{AnnotationRecord, PerCategory, ReportId};

/// Everything a detail panel needs to render one report's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleView {
    pub report_id: ReportId,
    pub state: LifecycleState,
    /// Present only for reports on the auto-confirm path
    pub countdown: Option<CountdownState>,
    pub urgency: Option<Urgency>,
    pub lock: Option<EditLock>,
    pub record: Option<AnnotationRecord>,
    pub draft: Option<PerCategory>,
}

impl LifecycleView {
    /// Whether a new edit session could be started right now.
    pub fn is_editable(&self) -> bool {
        matches!(self.state, LifecycleState::AiPendingReview) && self.lock.is_none()
    }
}

/// One row of the report list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub report_id: ReportId,
    pub title: String,
    pub reported_at: Option<Timestamp>,
    pub state: LifecycleState,
    pub countdown: Option<CountdownState>,
    pub urgency: Option<Urgency>,
}

impl ReportSummary {
    /// Sort key: open reports with the least time left first, closed reports last.
    pub(crate) fn sort_key(&self) -> (bool, u32, &ReportId) {
        let remaining = self
            .countdown
            .filter(|_| !self.state.is_terminal())
            .map_or(u32::MAX, |c| c.remaining_seconds);
        (self.state.is_terminal(), remaining, &self.report_id)
    }
}
