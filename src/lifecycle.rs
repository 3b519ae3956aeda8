//! Annotation lifecycle state machine.
//!
//! The controller is the single source of truth for every report's review
//! state. It owns the countdowns, the edit locks and the annotation store and
//! moves each report through:
//!
//! ```text
//! AiPendingReview --request_edit--> Editing --save--> Finalized
//!        ^                            |
//!        +-----------cancel-----------+
//! AiPendingReview --countdown expires--> AutoConfirmed
//! ```
//!
//! `Finalized` and `AutoConfirmed` are terminal. Pending expiries are applied
//! before every command, so an expiry and an edit request at the same instant
//! always resolve to `AutoConfirmed`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::{ExpiryPolicy, ReviewConfig};
use crate::countdown::Countdown;
use crate::error::{Result, ReviewError};
use crate::history::{EventLog, LifecycleEvent};
use crate::lock::{EditLock, EditLockManager};
use crate::model::{ActorId, AnnotationRecord, PerCategory, ReportId};
use crate::repository::ReportRepository;
use crate::store::AnnotationStore;
use crate::view::{LifecycleView, ReportSummary};

/// Review state of one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Waiting for a human; the countdown (if any) is running
    AiPendingReview,
    /// An annotator holds the edit lock
    Editing { holder: ActorId },
    /// A human annotation was committed
    Finalized,
    /// The countdown expired and the AI classification stands
    AutoConfirmed,
}

impl LifecycleState {
    /// Get the display name for this state.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::AiPendingReview => "AI_PENDING_REVIEW",
            LifecycleState::Editing { .. } => "EDITING",
            LifecycleState::Finalized => "FINALIZED",
            LifecycleState::AutoConfirmed => "AUTO_CONFIRMED",
        }
    }

    /// Check if no transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Finalized | LifecycleState::AutoConfirmed
        )
    }

    /// Error to report when an edit is attempted in a terminal state.
    fn terminal_error(&self, report_id: &ReportId) -> Option<ReviewError> {
        match self {
            LifecycleState::Finalized => Some(ReviewError::AlreadyFinalized {
                report_id: report_id.clone(),
            }),
            LifecycleState::AutoConfirmed => Some(ReviewError::AutoConfirmed {
                report_id: report_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Per-report bookkeeping.
#[derive(Debug, Clone)]
struct ReportLifecycle {
    title: String,
    reported_at: Option<Timestamp>,
    state: LifecycleState,
    /// `None` for reports without AI labels; they never auto-confirm.
    countdown: Option<Countdown>,
}

/// Handle returned by [`LifecycleController::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&LifecycleEvent)>;

/// Orchestrates countdowns, edit locks and annotation records for all reports.
pub struct LifecycleController<R, C = SystemClock> {
    repository: R,
    clock: C,
    config: ReviewConfig,
    lifecycles: BTreeMap<ReportId, ReportLifecycle>,
    locks: EditLockManager,
    store: AnnotationStore,
    history: EventLog,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<R: ReportRepository, C: Clock> LifecycleController<R, C> {
    /// Create a controller.
    ///
    /// Fails with [`ReviewError::InvalidDuration`] if the configured countdown
    /// is zero, so no countdown can be misconfigured later.
    pub fn new(repository: R, clock: C, config: ReviewConfig) -> Result<Self> {
        if config.countdown_seconds == 0 {
            return Err(ReviewError::InvalidDuration {
                seconds: config.countdown_seconds,
            });
        }
        let history = EventLog::with_limit(config.history_limit);
        Ok(Self {
            repository,
            clock,
            config,
            lifecycles: BTreeMap::new(),
            locks: EditLockManager::new(),
            store: AnnotationStore::new(),
            history,
            listeners: Vec::new(),
            next_subscription: 1,
        })
    }

    /// Start tracking a report and return its state.
    ///
    /// Reports with AI labels start their countdown here. Tracking an already
    /// tracked report only applies pending expiries.
    pub fn track(&mut self, report_id: &ReportId) -> Result<LifecycleState> {
        self.prepare(report_id)?;
        Ok(self.lifecycle(report_id)?.state.clone())
    }

    /// Track every report the repository knows about.
    pub fn track_all(&mut self) -> Result<usize> {
        let ids = self.repository.report_ids();
        for id in &ids {
            self.track(id)?;
        }
        Ok(ids.len())
    }

    /// Advance all countdowns to the current time and fire due expiries.
    ///
    /// Returns the transitions caused by this tick.
    pub fn tick(&mut self) -> Vec<LifecycleEvent> {
        let now = self.clock.now();
        let ids: Vec<ReportId> = self.lifecycles.keys().cloned().collect();
        let events: Vec<LifecycleEvent> = ids
            .iter()
            .filter_map(|id| self.sync(id, now))
            .collect();
        log::trace!("Tick at {}: {} transitions", now, events.len());
        events
    }

    /// Current lifecycle of a report, for rendering.
    pub fn lifecycle_state(&mut self, report_id: &ReportId) -> Result<LifecycleView> {
        self.prepare(report_id)?;
        self.view(report_id)
    }

    /// Open an edit session for `actor_id`.
    ///
    /// Succeeds idempotently if the actor already holds the lock.
    pub fn request_edit(&mut self, report_id: &ReportId, actor_id: &ActorId) -> Result<EditLock> {
        let now = self.prepare(report_id)?;
        let lifecycle = self.lifecycle(report_id)?;

        if let Some(err) = lifecycle.state.terminal_error(report_id) {
            log::warn!("Edit of {} by {} rejected: {}", report_id, actor_id, err);
            return Err(err);
        }
        // Expiry wins over a simultaneous edit request. Only the holder of a
        // deferred session may keep its lock.
        let is_holder =
            matches!(&lifecycle.state, LifecycleState::Editing { holder } if holder == actor_id);
        if !is_holder && lifecycle.countdown.as_ref().is_some_and(Countdown::is_expired) {
            return Err(ReviewError::AutoConfirmed {
                report_id: report_id.clone(),
            });
        }

        let lock = self.locks.acquire(report_id, actor_id, now)?.clone();
        let editing = LifecycleState::Editing {
            holder: actor_id.clone(),
        };
        if self.lifecycle(report_id)?.state != editing {
            self.set_state(report_id, editing, Some(actor_id.clone()), now);
        }
        Ok(lock)
    }

    /// Like [`Self::request_edit`], but returns a guard that cancels the
    /// session when dropped without being saved or cancelled.
    pub fn begin_edit(
        &mut self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<EditSession<'_, R, C>> {
        self.request_edit(report_id, actor_id)?;
        Ok(EditSession {
            controller: self,
            report_id: report_id.clone(),
            actor_id: actor_id.clone(),
            open: true,
        })
    }

    /// Abandon an edit session: release the lock and drop the draft.
    ///
    /// The countdown is neither reset nor paused.
    pub fn cancel_edit(&mut self, report_id: &ReportId, actor_id: &ActorId) -> Result<()> {
        let now = self.prepare(report_id)?;
        self.ensure_holder(report_id, actor_id)?;

        self.locks.release(report_id, actor_id)?;
        self.store.discard_draft(report_id);

        let expired = self
            .lifecycle(report_id)?
            .countdown
            .as_ref()
            .is_some_and(Countdown::is_expired);
        if expired {
            // Deferred expiry: the countdown ran out while the session was open.
            log::info!("🤖 {} auto-confirmed after deferred expiry", report_id);
            self.set_state(
                report_id,
                LifecycleState::AutoConfirmed,
                Some(actor_id.clone()),
                now,
            );
        } else {
            self.set_state(
                report_id,
                LifecycleState::AiPendingReview,
                Some(actor_id.clone()),
                now,
            );
        }
        Ok(())
    }

    /// Store an intermediate draft for the session held by `actor_id`.
    pub fn save_draft(
        &mut self,
        report_id: &ReportId,
        actor_id: &ActorId,
        per_category: PerCategory,
    ) -> Result<()> {
        self.prepare(report_id)?;
        self.ensure_holder(report_id, actor_id)?;
        self.store.save_draft(report_id, per_category)
    }

    /// Finalize the annotation of the session held by `actor_id`.
    ///
    /// On a validation failure the session stays open and the input is kept
    /// as the draft.
    pub fn save_annotation(
        &mut self,
        report_id: &ReportId,
        actor_id: &ActorId,
        annotator_role: &str,
        per_category: PerCategory,
    ) -> Result<AnnotationRecord> {
        let now = self.prepare(report_id)?;
        self.ensure_holder(report_id, actor_id)?;

        let record = self
            .store
            .finalize(report_id, per_category, actor_id, annotator_role, now)?
            .clone();
        self.locks.release(report_id, actor_id)?;
        self.set_state(
            report_id,
            LifecycleState::Finalized,
            Some(actor_id.clone()),
            now,
        );
        Ok(record)
    }

    /// Register a callback invoked on every state transition.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Summaries of all tracked reports, most urgent first.
    pub fn dashboard(&mut self) -> Vec<ReportSummary> {
        self.tick();
        let mut rows: Vec<ReportSummary> = self
            .lifecycles
            .iter()
            .map(|(id, lifecycle)| {
                let countdown = lifecycle.countdown.as_ref().map(Countdown::state);
                ReportSummary {
                    report_id: id.clone(),
                    title: lifecycle.title.clone(),
                    reported_at: lifecycle.reported_at,
                    state: lifecycle.state.clone(),
                    countdown,
                    urgency: countdown
                        .filter(|_| !lifecycle.state.is_terminal())
                        .map(|c| c.urgency()),
                }
            })
            .collect();
        rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        rows
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn locks(&self) -> &EditLockManager {
        &self.locks
    }

    pub fn history(&self) -> &EventLog {
        &self.history
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Import previously exported records; imported reports become finalized.
    ///
    /// Due expiries are applied first. Records for auto-confirmed reports, or
    /// reports whose countdown has run out, are skipped.
    pub fn import_records(&mut self, json: &str) -> Result<usize> {
        let records = AnnotationStore::parse_records_json(json)?;
        self.tick();
        let now = self.clock.now();

        let mut added = 0;
        for record in records {
            let report_id = record.report_id.clone();
            if let Some(lifecycle) = self.lifecycles.get(&report_id) {
                let expired = lifecycle
                    .countdown
                    .as_ref()
                    .is_some_and(Countdown::is_expired);
                if lifecycle.state == LifecycleState::AutoConfirmed || expired {
                    log::warn!(
                        "Skipping imported record for {}: auto-confirmed",
                        report_id
                    );
                    continue;
                }
            }
            if !self.store.insert_record(record) {
                continue;
            }
            added += 1;

            let open = self
                .lifecycles
                .get(&report_id)
                .is_some_and(|l| !l.state.is_terminal());
            if open {
                self.locks.force_release(&report_id);
                self.set_state(&report_id, LifecycleState::Finalized, None, now);
            }
        }
        log::info!("Imported {} annotation records", added);
        Ok(added)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Track the report if needed and apply any pending expiry.
    fn prepare(&mut self, report_id: &ReportId) -> Result<Timestamp> {
        let now = self.clock.now();
        if !self.lifecycles.contains_key(report_id) {
            self.start_tracking(report_id, now)?;
        }
        self.sync(report_id, now);
        Ok(now)
    }

    fn start_tracking(&mut self, report_id: &ReportId, now: Timestamp) -> Result<()> {
        let report =
            self.repository
                .get_report(report_id)
                .ok_or_else(|| ReviewError::UnknownReport {
                    report_id: report_id.clone(),
                })?;

        let (state, countdown) = if report.human_finalized || self.store.is_finalized(report_id)
        {
            (LifecycleState::Finalized, None)
        } else if report.has_ai_labels() {
            let countdown = Countdown::start(self.config.countdown_seconds, now)?;
            (LifecycleState::AiPendingReview, Some(countdown))
        } else {
            (LifecycleState::AiPendingReview, None)
        };

        log::debug!(
            "Tracking {} in {} (countdown: {})",
            report_id,
            state.name(),
            countdown.is_some()
        );
        self.lifecycles.insert(
            report_id.clone(),
            ReportLifecycle {
                title: report.title,
                reported_at: report.reported_at,
                state,
                countdown,
            },
        );
        Ok(())
    }

    /// Tick one report's countdown and handle its expiry.
    fn sync(&mut self, report_id: &ReportId, now: Timestamp) -> Option<LifecycleEvent> {
        let lifecycle = self.lifecycles.get_mut(report_id)?;
        let countdown = lifecycle.countdown.as_mut()?;
        countdown.tick(now);
        if !countdown.take_expiry() {
            return None;
        }

        match lifecycle.state.clone() {
            LifecycleState::AiPendingReview => self.auto_confirm(report_id, None, now),
            LifecycleState::Editing { holder } => match self.config.expiry_policy {
                ExpiryPolicy::Preempt => {
                    log::warn!(
                        "Countdown for {} expired while {} was editing; discarding the session",
                        report_id,
                        holder
                    );
                    self.auto_confirm(report_id, None, now)
                }
                ExpiryPolicy::Defer => {
                    log::info!(
                        "Countdown for {} expired while {} is editing; waiting for the session to end",
                        report_id,
                        holder
                    );
                    None
                }
            },
            LifecycleState::Finalized | LifecycleState::AutoConfirmed => None,
        }
    }

    fn auto_confirm(
        &mut self,
        report_id: &ReportId,
        actor: Option<ActorId>,
        now: Timestamp,
    ) -> Option<LifecycleEvent> {
        self.locks.force_release(report_id);
        self.store.discard_draft(report_id);
        log::info!("🤖 {} auto-confirmed", report_id);
        self.set_state(report_id, LifecycleState::AutoConfirmed, actor, now)
    }

    /// Check that `actor_id` is the current editor of the report.
    fn ensure_holder(&self, report_id: &ReportId, actor_id: &ActorId) -> Result<()> {
        let state = &self.lifecycle(report_id)?.state;
        if let Some(err) = state.terminal_error(report_id) {
            return Err(err);
        }
        match state {
            LifecycleState::Editing { holder } if holder == actor_id => Ok(()),
            _ => Err(ReviewError::NotHolder {
                report_id: report_id.clone(),
                actor: actor_id.clone(),
            }),
        }
    }

    fn set_state(
        &mut self,
        report_id: &ReportId,
        to: LifecycleState,
        actor: Option<ActorId>,
        now: Timestamp,
    ) -> Option<LifecycleEvent> {
        let lifecycle = self.lifecycles.get_mut(report_id)?;
        let from = std::mem::replace(&mut lifecycle.state, to.clone());
        if to.is_terminal() {
            if let Some(countdown) = lifecycle.countdown.as_mut() {
                countdown.freeze();
            }
        }
        log::debug!("➡️ {}: {} -> {}", report_id, from.name(), to.name());

        let event = LifecycleEvent {
            report_id: report_id.clone(),
            from,
            to,
            actor,
            at: now,
        };
        self.history.push(event.clone());
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        Some(event)
    }

    fn lifecycle(&self, report_id: &ReportId) -> Result<&ReportLifecycle> {
        self.lifecycles
            .get(report_id)
            .ok_or_else(|| ReviewError::UnknownReport {
                report_id: report_id.clone(),
            })
    }

    fn view(&self, report_id: &ReportId) -> Result<LifecycleView> {
        let lifecycle = self.lifecycle(report_id)?;
        let countdown = lifecycle.countdown.as_ref().map(Countdown::state);
        Ok(LifecycleView {
            report_id: report_id.clone(),
            state: lifecycle.state.clone(),
            countdown,
            urgency: countdown
                .filter(|_| !lifecycle.state.is_terminal())
                .map(|c| c.urgency()),
            lock: self.locks.is_locked(report_id).cloned(),
            record: self.store.get(report_id).cloned(),
            draft: self.store.draft(report_id).cloned(),
        })
    }
}

/// An open edit session.
///
/// Dropping the session without calling [`EditSession::save`] or
/// [`EditSession::cancel`] cancels it, so the lock is released on every exit
/// path.
pub struct EditSession<'a, R: ReportRepository, C: Clock> {
    controller: &'a mut LifecycleController<R, C>,
    report_id: ReportId,
    actor_id: ActorId,
    open: bool,
}

impl<R: ReportRepository, C: Clock> EditSession<'_, R, C> {
    pub fn report_id(&self) -> &ReportId {
        &self.report_id
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Store a draft.
    pub fn save_draft(&mut self, per_category: PerCategory) -> Result<()> {
        let result = self
            .controller
            .save_draft(&self.report_id, &self.actor_id, per_category);
        self.close_on_terminal(&result);
        result
    }

    /// Finalize the annotation.
    ///
    /// The session stays open after a validation failure so the input can be
    /// corrected and saved again.
    pub fn save(
        &mut self,
        annotator_role: &str,
        per_category: PerCategory,
    ) -> Result<AnnotationRecord> {
        let result = self.controller.save_annotation(
            &self.report_id,
            &self.actor_id,
            annotator_role,
            per_category,
        );
        if result.is_ok() {
            self.open = false;
        }
        self.close_on_terminal(&result);
        result
    }

    /// Cancel the session explicitly.
    pub fn cancel(mut self) -> Result<()> {
        self.open = false;
        self.controller.cancel_edit(&self.report_id, &self.actor_id)
    }

    /// Current lifecycle view of the edited report.
    pub fn view(&mut self) -> Result<LifecycleView> {
        self.controller.lifecycle_state(&self.report_id)
    }

    /// Whether the session still holds the lock.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn close_on_terminal<T>(&mut self, result: &Result<T>) {
        if let Err(err) = result {
            if err.is_terminal() {
                self.open = false;
            }
        }
    }
}

impl<R: ReportRepository, C: Clock> Drop for EditSession<'_, R, C> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        log::debug!(
            "Edit session for {} by {} dropped without saving",
            self.report_id,
            self.actor_id
        );
        if let Err(err) = self.controller.cancel_edit(&self.report_id, &self.actor_id) {
            log::warn!(
                "Failed to close edit session for {}: {}",
                self.report_id,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::countdown::Urgency;
    use crate::model::{AiClassification, CategoryAnnotation, CategoryTag, HazardReport};
    use crate::repository::InMemoryReportRepository;
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestController = LifecycleController<InMemoryReportRepository, ManualClock>;

    fn labelled() -> ReportId {
        ReportId::new("HR-1")
    }

    fn unlabelled() -> ReportId {
        ReportId::new("HR-2")
    }

    fn alice() -> ActorId {
        ActorId::new("alice")
    }

    fn bob() -> ActorId {
        ActorId::new("bob")
    }

    fn setup_with(config: ReviewConfig) -> (TestController, ManualClock) {
        let repo = InMemoryReportRepository::with_reports([
            HazardReport::new("HR-1", "Blocked fire exit")
                .with_classification(AiClassification::new([CategoryTag::Tbc], 0.91)),
            HazardReport::new("HR-2", "Unlabelled report"),
            HazardReport::new("HR-3", "Closed earlier")
                .with_classification(AiClassification::new([CategoryTag::Gr], 0.7))
                .finalized(),
        ]);
        let clock = ManualClock::starting_at(Timestamp::from_millis(1_000_000));
        let controller = LifecycleController::new(repo, clock.clone(), config).unwrap();
        (controller, clock)
    }

    fn setup() -> (TestController, ManualClock) {
        setup_with(ReviewConfig::new().with_countdown_seconds(120))
    }

    fn note(text: &str) -> PerCategory {
        let mut per_category = PerCategory::new();
        per_category.insert(CategoryTag::Tbc, CategoryAnnotation::new("1", text));
        per_category
    }

    #[test]
    fn test_zero_countdown_rejected_at_construction() {
        let repo = InMemoryReportRepository::new();
        let config = ReviewConfig::new().with_countdown_seconds(0);
        let result = LifecycleController::new(repo, ManualClock::default(), config);
        assert!(matches!(result, Err(ReviewError::InvalidDuration { .. })));
    }

    #[test]
    fn test_initial_states() {
        let (mut controller, _) = setup();

        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AiPendingReview);
        assert_eq!(view.countdown.unwrap().remaining_seconds, 120);
        assert_eq!(view.urgency, Some(Urgency::Normal));
        assert!(view.is_editable());

        let view = controller.lifecycle_state(&unlabelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AiPendingReview);
        assert!(view.countdown.is_none());

        let view = controller.lifecycle_state(&ReportId::new("HR-3")).unwrap();
        assert_eq!(view.state, LifecycleState::Finalized);
    }

    #[test]
    fn test_unknown_report() {
        let (mut controller, _) = setup();
        let err = controller
            .request_edit(&ReportId::new("HR-404"), &alice())
            .unwrap_err();
        assert!(matches!(err, ReviewError::UnknownReport { .. }));
    }

    #[test]
    fn test_request_edit_and_exclusion() {
        let (mut controller, _) = setup();

        let lock = controller.request_edit(&labelled(), &alice()).unwrap();
        assert_eq!(lock.holder_id, alice());
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Editing { holder: alice() }
        );

        // Idempotent for the holder, refused for anyone else
        controller.request_edit(&labelled(), &alice()).unwrap();
        match controller.request_edit(&labelled(), &bob()).unwrap_err() {
            ReviewError::LockHeld { holder } => assert_eq!(holder, alice()),
            other => panic!("unexpected error: {other:?}"),
        }
        // Only one transition was recorded
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_race_expiry_wins() {
        let (mut controller, clock) = setup();
        controller.track(&labelled()).unwrap();

        // No tick ran at the instant of expiry; the request itself observes it.
        clock.advance_secs(120);
        let err = controller.request_edit(&labelled(), &alice()).unwrap_err();
        assert!(matches!(err, ReviewError::AutoConfirmed { .. }));
        assert!(controller.locks().is_locked(&labelled()).is_none());

        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AutoConfirmed);
        assert_eq!(view.countdown.unwrap().remaining_seconds, 0);
        assert!(view.urgency.is_none());
    }

    #[test]
    fn test_editing_does_not_pause_countdown() {
        let (mut controller, clock) = setup();
        controller.track(&labelled()).unwrap();

        clock.advance_secs(30);
        controller.request_edit(&labelled(), &alice()).unwrap();
        clock.advance_secs(40);
        controller.cancel_edit(&labelled(), &alice()).unwrap();

        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AiPendingReview);
        assert_eq!(view.countdown.unwrap().remaining_seconds, 50);
    }

    #[test]
    fn test_cancel_discards_draft() {
        let (mut controller, _) = setup();
        controller.request_edit(&labelled(), &alice()).unwrap();
        controller
            .save_draft(&labelled(), &alice(), note("half done"))
            .unwrap();
        assert!(controller.lifecycle_state(&labelled()).unwrap().draft.is_some());

        controller.cancel_edit(&labelled(), &alice()).unwrap();
        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert!(view.draft.is_none());
        assert!(view.lock.is_none());
    }

    #[test]
    fn test_only_holder_may_cancel_or_save() {
        let (mut controller, _) = setup();

        assert!(matches!(
            controller.cancel_edit(&labelled(), &alice()),
            Err(ReviewError::NotHolder { .. })
        ));

        controller.request_edit(&labelled(), &alice()).unwrap();
        assert!(matches!(
            controller.cancel_edit(&labelled(), &bob()),
            Err(ReviewError::NotHolder { .. })
        ));
        assert!(matches!(
            controller.save_annotation(&labelled(), &bob(), "reviewer", note("x")),
            Err(ReviewError::NotHolder { .. })
        ));
        assert!(matches!(
            controller.save_draft(&labelled(), &bob(), note("x")),
            Err(ReviewError::NotHolder { .. })
        ));
    }

    #[test]
    fn test_validation_failure_keeps_session() {
        let (mut controller, _) = setup();
        controller.request_edit(&labelled(), &alice()).unwrap();

        let err = controller
            .save_annotation(&labelled(), &alice(), "reviewer", note("   "))
            .unwrap_err();
        assert!(matches!(err, ReviewError::ValidationFailed { .. }));

        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::Editing { holder: alice() });
        assert_eq!(view.draft, Some(note("   ")));
        assert_eq!(view.lock.unwrap().holder_id, alice());

        controller
            .save_annotation(&labelled(), &alice(), "reviewer", note("fixed"))
            .unwrap();
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Finalized
        );
    }

    #[test]
    fn test_terminal_states_reject_edits() {
        let (mut controller, clock) = setup();
        controller.request_edit(&labelled(), &alice()).unwrap();
        controller
            .save_annotation(&labelled(), &alice(), "reviewer", note("done"))
            .unwrap();
        assert!(matches!(
            controller.request_edit(&labelled(), &bob()),
            Err(ReviewError::AlreadyFinalized { .. })
        ));
        assert!(matches!(
            controller.save_annotation(&labelled(), &alice(), "reviewer", note("again")),
            Err(ReviewError::AlreadyFinalized { .. })
        ));

        // Finalized reports are no longer countdown subjects
        clock.advance_secs(500);
        assert!(controller.tick().is_empty());
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Finalized
        );
    }

    #[test]
    fn test_unlabelled_reports_never_auto_confirm() {
        let (mut controller, clock) = setup();
        controller.track(&unlabelled()).unwrap();
        clock.advance_secs(100_000);
        assert!(controller.tick().is_empty());

        controller.request_edit(&unlabelled(), &bob()).unwrap();
        let record = controller
            .save_annotation(&unlabelled(), &bob(), "supervisor", note("late but fine"))
            .unwrap();
        assert_eq!(record.annotator_role, "supervisor");
    }

    #[test]
    fn test_preempt_policy_closes_open_session() {
        let (mut controller, clock) = setup();
        controller.request_edit(&labelled(), &alice()).unwrap();
        controller
            .save_draft(&labelled(), &alice(), note("work in progress"))
            .unwrap();

        clock.advance_secs(120);
        let events = controller.tick();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, LifecycleState::Editing { holder: alice() });
        assert_eq!(events[0].to, LifecycleState::AutoConfirmed);

        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert!(view.lock.is_none());
        assert!(view.draft.is_none());
        assert!(view.record.is_none());
        assert!(matches!(
            controller.save_annotation(&labelled(), &alice(), "reviewer", note("too late")),
            Err(ReviewError::AutoConfirmed { .. })
        ));
    }

    #[test]
    fn test_defer_policy_lets_editor_finish() {
        let config = ReviewConfig::new()
            .with_countdown_seconds(60)
            .with_expiry_policy(ExpiryPolicy::Defer);
        let (mut controller, clock) = setup_with(config);
        controller.request_edit(&labelled(), &alice()).unwrap();

        clock.advance_secs(90);
        assert!(controller.tick().is_empty());
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Editing { holder: alice() }
        );

        controller
            .save_annotation(&labelled(), &alice(), "reviewer", note("made it"))
            .unwrap();
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Finalized
        );
    }

    #[test]
    fn test_defer_policy_other_actor_sees_auto_confirmed() {
        let config = ReviewConfig::new()
            .with_countdown_seconds(60)
            .with_expiry_policy(ExpiryPolicy::Defer);
        let (mut controller, clock) = setup_with(config);
        controller.request_edit(&labelled(), &alice()).unwrap();

        clock.advance_secs(90);
        assert!(matches!(
            controller.request_edit(&labelled(), &bob()),
            Err(ReviewError::AutoConfirmed { .. })
        ));

        // The deferred editor can still re-request its own lock
        let lock = controller.request_edit(&labelled(), &alice()).unwrap();
        assert_eq!(lock.holder_id, alice());
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Editing { holder: alice() }
        );
    }

    #[test]
    fn test_defer_policy_cancel_auto_confirms() {
        let config = ReviewConfig::new()
            .with_countdown_seconds(60)
            .with_expiry_policy(ExpiryPolicy::Defer);
        let (mut controller, clock) = setup_with(config);
        controller.request_edit(&labelled(), &alice()).unwrap();

        clock.advance_secs(61);
        controller.cancel_edit(&labelled(), &alice()).unwrap();
        assert_eq!(
            controller.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::AutoConfirmed
        );
        assert!(matches!(
            controller.request_edit(&labelled(), &bob()),
            Err(ReviewError::AutoConfirmed { .. })
        ));
    }

    #[test]
    fn test_edit_session_drop_releases_lock() {
        let (mut controller, _) = setup();
        {
            let mut session = controller.begin_edit(&labelled(), &alice()).unwrap();
            session.save_draft(note("abandoned")).unwrap();
            assert!(session.is_open());
            // Navigating away: the session goes out of scope
        }
        let view = controller.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AiPendingReview);
        assert!(view.lock.is_none());
        assert!(view.draft.is_none());

        controller.request_edit(&labelled(), &bob()).unwrap();
    }

    #[test]
    fn test_edit_session_drop_on_error_path() {
        fn review(controller: &mut TestController) -> Result<AnnotationRecord> {
            let mut session = controller.begin_edit(&labelled(), &alice())?;
            // Validation fails and `?` leaves the function with the session open
            let record = session.save("reviewer", PerCategory::new())?;
            Ok(record)
        }

        let (mut controller, _) = setup();
        assert!(review(&mut controller).is_err());
        assert!(controller.locks().is_empty());
    }

    #[test]
    fn test_edit_session_save() {
        let (mut controller, _) = setup();
        let mut session = controller.begin_edit(&labelled(), &alice()).unwrap();
        assert!(session.save("reviewer", note("")).is_err());
        assert!(session.is_open());

        let record = session.save("reviewer", note("checked")).unwrap();
        assert!(!session.is_open());
        assert_eq!(session.view().unwrap().state, LifecycleState::Finalized);
        drop(session);

        assert_eq!(controller.store().get(&labelled()), Some(&record));
    }

    #[test]
    fn test_subscribers_see_every_transition() {
        let (mut controller, clock) = setup();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let id = controller.subscribe(move |event| {
            sink.borrow_mut()
                .push(format!("{}:{}", event.report_id, event.to.name()));
        });

        controller.request_edit(&labelled(), &alice()).unwrap();
        controller.cancel_edit(&labelled(), &alice()).unwrap();
        clock.advance_secs(120);
        controller.tick();

        assert_eq!(
            *seen.borrow(),
            vec![
                "HR-1:EDITING".to_string(),
                "HR-1:AI_PENDING_REVIEW".to_string(),
                "HR-1:AUTO_CONFIRMED".to_string(),
            ]
        );

        assert!(controller.unsubscribe(id));
        assert!(!controller.unsubscribe(id));
        controller.request_edit(&unlabelled(), &alice()).unwrap();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_dashboard_orders_by_urgency() {
        let repo = InMemoryReportRepository::with_reports([
            HazardReport::new("A", "plain"),
            HazardReport::new("B", "labelled early")
                .with_reported_at(Timestamp::from_millis(1_000))
                .with_classification(AiClassification::new([CategoryTag::Gr], 0.5)),
            HazardReport::new("C", "done").finalized(),
            HazardReport::new("D", "labelled late")
                .with_classification(AiClassification::new([CategoryTag::Pspp], 0.5)),
        ]);
        let clock = ManualClock::starting_at(Timestamp::default());
        let mut controller =
            LifecycleController::new(repo, clock.clone(), ReviewConfig::default()).unwrap();

        controller.track(&ReportId::new("B")).unwrap();
        clock.advance_secs(70);
        assert_eq!(controller.track_all().unwrap(), 4);

        let rows = controller.dashboard();
        let order: Vec<&str> = rows.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        assert_eq!(rows[0].urgency, Some(Urgency::Warning));
        assert_eq!(rows[1].urgency, Some(Urgency::Normal));
        assert_eq!(rows[0].title, "labelled early");
        assert_eq!(rows[0].reported_at, Some(Timestamp::from_millis(1_000)));
        assert_eq!(rows[1].reported_at, None);
    }

    #[test]
    fn test_import_records_finalizes_tracked_reports() {
        let (mut source, _) = setup();
        source.request_edit(&labelled(), &alice()).unwrap();
        source
            .save_annotation(&labelled(), &alice(), "reviewer", note("imported"))
            .unwrap();
        let json = source.store().records_to_json().unwrap();

        let (mut target, _) = setup();
        target.track(&labelled()).unwrap();
        assert_eq!(target.import_records(&json).unwrap(), 1);
        let view = target.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::Finalized);
        assert_eq!(view.record.unwrap().annotator_id, alice());
    }

    fn exported_record() -> String {
        let (mut source, _) = setup();
        source.request_edit(&labelled(), &alice()).unwrap();
        source
            .save_annotation(&labelled(), &alice(), "reviewer", note("imported"))
            .unwrap();
        source.store().records_to_json().unwrap()
    }

    #[test]
    fn test_import_skips_auto_confirmed_report() {
        let json = exported_record();
        let (mut target, clock) = setup();
        target.track(&labelled()).unwrap();
        clock.advance_secs(120);
        assert_eq!(target.tick().len(), 1);

        assert_eq!(target.import_records(&json).unwrap(), 0);
        let view = target.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AutoConfirmed);
        assert!(view.record.is_none());
        assert!(target.store().is_empty());
    }

    #[test]
    fn test_import_applies_due_expiry_first() {
        let json = exported_record();
        let (mut target, clock) = setup();
        target.track(&labelled()).unwrap();
        // Expired but not yet ticked
        clock.advance_secs(150);

        assert_eq!(target.import_records(&json).unwrap(), 0);
        let view = target.lifecycle_state(&labelled()).unwrap();
        assert_eq!(view.state, LifecycleState::AutoConfirmed);
        assert!(view.record.is_none());
    }

    #[test]
    fn test_import_skips_expired_deferred_edit() {
        let json = exported_record();
        let config = ReviewConfig::new()
            .with_countdown_seconds(60)
            .with_expiry_policy(ExpiryPolicy::Defer);
        let (mut target, clock) = setup_with(config);
        target.request_edit(&labelled(), &alice()).unwrap();
        clock.advance_secs(61);

        assert_eq!(target.import_records(&json).unwrap(), 0);
        assert!(target.store().get(&labelled()).is_none());
        assert_eq!(
            target.lifecycle_state(&labelled()).unwrap().state,
            LifecycleState::Editing { holder: alice() }
        );
    }
}
