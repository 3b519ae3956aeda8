//! Annotation draft and record storage.
//!
//! Holds at most one draft and one finalized record per report. Finalized
//! records are write-once: every later write for that report fails with
//! [`ReviewError::AlreadyFinalized`].

use std::collections::HashMap;

use crate::clock::Timestamp;
use crate::error::{Result, ReviewError};
use crate::model::{ActorId, AnnotationRecord, PerCategory, ReportId, has_any_note};

/// Drafts and finalized annotation records, keyed by report.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    drafts: HashMap<ReportId, PerCategory>,
    records: HashMap<ReportId, AnnotationRecord>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, report_id: &ReportId) -> Result<()> {
        if self.records.contains_key(report_id) {
            return Err(ReviewError::AlreadyFinalized {
                report_id: report_id.clone(),
            });
        }
        Ok(())
    }

    /// Store a draft, replacing any earlier one.
    pub fn save_draft(&mut self, report_id: &ReportId, per_category: PerCategory) -> Result<()> {
        self.ensure_open(report_id)?;
        self.drafts.insert(report_id.clone(), per_category);
        log::trace!("Draft saved for {}", report_id);
        Ok(())
    }

    /// Current draft for a report.
    pub fn draft(&self, report_id: &ReportId) -> Option<&PerCategory> {
        self.drafts.get(report_id)
    }

    /// Throw away the draft for a report.
    pub fn discard_draft(&mut self, report_id: &ReportId) -> Option<PerCategory> {
        let draft = self.drafts.remove(report_id);
        if draft.is_some() {
            log::trace!("Draft discarded for {}", report_id);
        }
        draft
    }

    /// Commit an annotation as the immutable record for a report.
    ///
    /// At least one category needs a non-blank note. A rejected annotation is
    /// kept as the draft so the reviewer can correct it.
    pub fn finalize(
        &mut self,
        report_id: &ReportId,
        per_category: PerCategory,
        annotator_id: &ActorId,
        annotator_role: &str,
        now: Timestamp,
    ) -> Result<&AnnotationRecord> {
        self.ensure_open(report_id)?;

        if !has_any_note(&per_category) {
            self.drafts.insert(report_id.clone(), per_category);
            return Err(ReviewError::validation(
                "at least one category needs a non-empty note",
            ));
        }

        self.drafts.remove(report_id);
        let record = AnnotationRecord::finalized(
            report_id.clone(),
            per_category,
            annotator_id.clone(),
            annotator_role.to_string(),
            now,
        );
        log::info!("✅ Annotation for {} finalized by {}", report_id, annotator_id);
        let record: &AnnotationRecord = self.records.entry(report_id.clone()).or_insert(record);
        Ok(record)
    }

    /// Finalized record for a report.
    pub fn get(&self, report_id: &ReportId) -> Option<&AnnotationRecord> {
        self.records.get(report_id)
    }

    pub fn is_finalized(&self, report_id: &ReportId) -> bool {
        self.records.contains_key(report_id)
    }

    /// All finalized records, ordered by report id.
    pub fn records(&self) -> Vec<&AnnotationRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| a.report_id.cmp(&b.report_id));
        records
    }

    /// Number of finalized records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize all finalized records to JSON.
    pub fn records_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }

    /// Parse records produced by [`Self::records_to_json`].
    ///
    /// Every record must be finalized.
    pub fn parse_records_json(json: &str) -> Result<Vec<AnnotationRecord>> {
        let incoming: Vec<AnnotationRecord> = serde_json::from_str(json)?;

        if let Some(open) = incoming.iter().find(|r| !r.finalized) {
            return Err(ReviewError::validation(format!(
                "record for {} is not finalized",
                open.report_id
            )));
        }
        Ok(incoming)
    }

    /// Add a finalized record unless the report already has one.
    ///
    /// Returns whether the record was added.
    pub fn insert_record(&mut self, record: AnnotationRecord) -> bool {
        if self.records.contains_key(&record.report_id) {
            log::warn!(
                "Skipping imported record for {}: already finalized",
                record.report_id
            );
            return false;
        }
        self.drafts.remove(&record.report_id);
        self.records.insert(record.report_id.clone(), record);
        true
    }

    /// Import finalized records from JSON produced by [`Self::records_to_json`].
    ///
    /// Existing records are never replaced. Returns how many records were added.
    pub fn load_records_json(&mut self, json: &str) -> Result<usize> {
        let mut added = 0;
        for record in Self::parse_records_json(json)? {
            if self.insert_record(record) {
                added += 1;
            }
        }
        log::info!("Imported {} annotation records", added);
        Ok(added)
    }
}
