//! Read-only access to hazard reports.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{HazardReport, ReportId};

/// Source of hazard reports consumed by the lifecycle controller.
pub trait ReportRepository {
    /// Look up a report by id.
    fn get_report(&self, id: &ReportId) -> Option<HazardReport>;

    /// Ids of all known reports.
    fn report_ids(&self) -> Vec<ReportId>;
}

/// Report repository backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportRepository {
    reports: BTreeMap<ReportId, HazardReport>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the given reports.
    pub fn with_reports(reports: impl IntoIterator<Item = HazardReport>) -> Self {
        let mut repo = Self::new();
        for report in reports {
            repo.insert(report);
        }
        repo
    }

    /// Parse a JSON array of reports.
    pub fn from_json(json: &str) -> Result<Self> {
        let reports: Vec<HazardReport> = serde_json::from_str(json)?;
        log::debug!("Loaded {} reports from JSON", reports.len());
        Ok(Self::with_reports(reports))
    }

    /// Add or replace a report.
    pub fn insert(&mut self, report: HazardReport) -> Option<HazardReport> {
        self.reports.insert(report.id.clone(), report)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl ReportRepository for InMemoryReportRepository {
    fn get_report(&self, id: &ReportId) -> Option<HazardReport> {
        self.reports.get(id).cloned()
    }

    fn report_ids(&self) -> Vec<ReportId> {
        self.reports.keys().cloned().collect()
    }
}
