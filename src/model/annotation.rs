//! Human annotation data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ActorId, CategoryTag, ReportId};
use crate::clock::Timestamp;

/// A reviewer's input for a single category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAnnotation {
    /// Classification chosen by the reviewer
    #[serde(default)]
    pub selected_classification: String,
    /// Free-text note
    #[serde(default)]
    pub note: String,
}

impl CategoryAnnotation {
    pub fn new(selected_classification: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            selected_classification: selected_classification.into(),
            note: note.into(),
        }
    }

    /// Whether the note contains anything besides whitespace.
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }
}

/// Annotation input keyed by category.
pub type PerCategory = BTreeMap<CategoryTag, CategoryAnnotation>;

/// Check that at least one category carries a non-blank note.
pub fn has_any_note(per_category: &PerCategory) -> bool {
    per_category.values().any(CategoryAnnotation::has_note)
}

/// A committed human annotation.
///
/// Records are only ever constructed finalized; the store hands out shared
/// references so nothing can mutate them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub report_id: ReportId,
    pub per_category: PerCategory,
    pub annotator_id: ActorId,
    pub annotator_role: String,
    pub created_at: Timestamp,
    pub finalized: bool,
}

impl AnnotationRecord {
    pub(crate) fn finalized(
        report_id: ReportId,
        per_category: PerCategory,
        annotator_id: ActorId,
        annotator_role: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            report_id,
            per_category,
            annotator_id,
            annotator_role,
            created_at,
            finalized: true,
        }
    }

    /// Annotation for a single category, if one was entered.
    pub fn category(&self, tag: CategoryTag) -> Option<&CategoryAnnotation> {
        self.per_category.get(&tag)
    }
}
