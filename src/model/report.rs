//! Hazard report data model.
//!
//! Reports are owned by the report repository. The lifecycle core reads the id,
//! the AI labels and whether a human already finalized the report; title and
//! report time are passed through to the dashboard.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::CategoryTag;
use crate::clock::Timestamp;

/// Unique identifier for a hazard report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of an annotator (the actor that edits a report).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Pre-computed AI classification attached to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiClassification {
    /// Categories the classifier matched
    pub labels: BTreeSet<CategoryTag>,
    /// Classifier confidence in the range 0.0..=1.0
    pub confidence: f32,
    /// Free-text explanation of the classification
    pub reasoning: String,
}

impl AiClassification {
    pub fn new(labels: impl IntoIterator<Item = CategoryTag>, confidence: f32) -> Self {
        Self {
            labels: labels.into_iter().collect(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: String::new(),
        }
    }

    /// Set the reasoning text.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// A safety-hazard report as supplied by the report repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    pub id: ReportId,
    /// Short title shown in report lists
    #[serde(default)]
    pub title: String,
    /// Where the hazard was observed
    #[serde(default)]
    pub location: String,
    /// When the hazard was reported
    #[serde(default)]
    pub reported_at: Option<Timestamp>,
    /// AI classification, if the report has been through the classifier
    #[serde(default)]
    pub ai_classification: Option<AiClassification>,
    /// Whether a human already finalized an annotation for this report
    #[serde(default)]
    pub human_finalized: bool,
}

impl HazardReport {
    /// Create a report with no classification.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: ReportId::new(id),
            title: title.into(),
            location: String::new(),
            reported_at: None,
            ai_classification: None,
            human_finalized: false,
        }
    }

    /// Attach an AI classification.
    pub fn with_classification(mut self, classification: AiClassification) -> Self {
        self.ai_classification = Some(classification);
        self
    }

    /// Set the location text.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the report time.
    pub fn with_reported_at(mut self, reported_at: Timestamp) -> Self {
        self.reported_at = Some(reported_at);
        self
    }

    /// Mark the report as already finalized by a human.
    pub fn finalized(mut self) -> Self {
        self.human_finalized = true;
        self
    }

    /// Matched AI labels (empty when the report was never classified).
    pub fn labels(&self) -> BTreeSet<CategoryTag> {
        self.ai_classification
            .as_ref()
            .map(|c| c.labels.clone())
            .unwrap_or_default()
    }

    /// Whether the report carries at least one AI label.
    ///
    /// Only such reports are subject to the auto-confirm countdown.
    pub fn has_ai_labels(&self) -> bool {
        self.ai_classification
            .as_ref()
            .is_some_and(|c| !c.labels.is_empty())
    }
}
