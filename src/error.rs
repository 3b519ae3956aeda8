//! Error types for review lifecycle operations.

use thiserror::Error;

use crate::model::{ActorId, ReportId};

/// Errors that can occur while driving a report's annotation lifecycle.
///
/// Every variant is recoverable at the presentation boundary; none of them
/// leaves the controller in a partially updated state.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Countdown configured with a non-positive duration
    #[error("Invalid countdown duration: {seconds} seconds (must be greater than zero)")]
    InvalidDuration {
        /// The rejected duration
        seconds: u32,
    },

    /// Another annotator currently holds the edit lock
    #[error("Report is being edited by {holder}")]
    LockHeld {
        /// Current lock holder
        holder: ActorId,
    },

    /// Release or save attempted by an actor that does not hold the lock
    #[error("{actor} does not hold the edit lock for report {report_id}")]
    NotHolder {
        /// The report whose lock was addressed
        report_id: ReportId,
        /// The actor that attempted the operation
        actor: ActorId,
    },

    /// Annotation rejected by validation
    #[error("Annotation rejected: {reason}")]
    ValidationFailed {
        /// Description of what is missing
        reason: String,
    },

    /// A human annotation was already finalized for this report
    #[error("Report {report_id} has already been finalized")]
    AlreadyFinalized {
        /// The finalized report
        report_id: ReportId,
    },

    /// The AI classification was auto-confirmed before a human annotated
    #[error("Report {report_id} was auto-confirmed; manual annotation is closed")]
    AutoConfirmed {
        /// The auto-confirmed report
        report_id: ReportId,
    },

    /// Report id unknown to the repository
    #[error("Report not found: {report_id}")]
    UnknownReport {
        /// The missing report id
        report_id: ReportId,
    },

    /// JSON error while importing or exporting records
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReviewError {
    /// Create a validation error with a message.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
        }
    }

    /// Whether the same action may succeed later without the user changing anything.
    ///
    /// Only a held lock clears up on its own (once the holder saves or cancels).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockHeld { .. })
    }

    /// Whether the error reports a terminal lifecycle state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyFinalized { .. } | Self::AutoConfirmed { .. }
        )
    }
}

/// Result alias for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;
