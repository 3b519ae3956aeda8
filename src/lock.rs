//! Per-report edit locks.
//!
//! Locks are advisory: the manager only records who may edit a report, the
//! store itself does not check it. A lock stays held until it is released
//! explicitly or force-released by an auto-confirm.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::clock::Timestamp;
use crate::error::{Result, ReviewError};
use crate::model::{ActorId, ReportId};

/// An edit lock held on one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    pub holder_id: ActorId,
    pub acquired_at: Timestamp,
}

/// Grants exclusive edit access, one holder per report.
#[derive(Debug, Clone, Default)]
pub struct EditLockManager {
    locks: HashMap<ReportId, EditLock>,
}

impl EditLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `report_id`.
    ///
    /// Re-acquiring by the current holder succeeds and keeps the original
    /// acquisition time.
    pub fn acquire(
        &mut self,
        report_id: &ReportId,
        actor_id: &ActorId,
        now: Timestamp,
    ) -> Result<&EditLock> {
        if let Some(lock) = self.locks.get(report_id) {
            if &lock.holder_id != actor_id {
                log::debug!(
                    "🔒 Lock on {} refused for {}: held by {}",
                    report_id,
                    actor_id,
                    lock.holder_id
                );
                return Err(ReviewError::LockHeld {
                    holder: lock.holder_id.clone(),
                });
            }
        }

        let lock = self
            .locks
            .entry(report_id.clone())
            .or_insert_with(|| {
                log::debug!("🔒 Lock on {} acquired by {}", report_id, actor_id);
                EditLock {
                    holder_id: actor_id.clone(),
                    acquired_at: now,
                }
            });
        Ok(lock)
    }

    /// Release the lock held by `actor_id`.
    ///
    /// Releasing a lock the actor does not hold is reported, not ignored.
    pub fn release(&mut self, report_id: &ReportId, actor_id: &ActorId) -> Result<()> {
        match self.locks.get(report_id) {
            Some(lock) if &lock.holder_id == actor_id => {
                self.locks.remove(report_id);
                log::debug!("🔓 Lock on {} released by {}", report_id, actor_id);
                Ok(())
            }
            _ => Err(ReviewError::NotHolder {
                report_id: report_id.clone(),
                actor: actor_id.clone(),
            }),
        }
    }

    /// Drop the lock regardless of holder.
    pub fn force_release(&mut self, report_id: &ReportId) -> Option<EditLock> {
        let lock = self.locks.remove(report_id)?;
        log::debug!(
            "🔓 Lock on {} force-released (was held by {})",
            report_id,
            lock.holder_id
        );
        Some(lock)
    }

    /// Current lock on `report_id`, if any.
    pub fn is_locked(&self, report_id: &ReportId) -> Option<&EditLock> {
        self.locks.get(report_id)
    }

    /// Whether `actor_id` holds the lock on `report_id`.
    pub fn is_held_by(&self, report_id: &ReportId, actor_id: &ActorId) -> bool {
        self.locks
            .get(report_id)
            .is_some_and(|lock| &lock.holder_id == actor_id)
    }

    /// Number of locks currently held.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
