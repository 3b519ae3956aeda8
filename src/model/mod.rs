//! Data models for hazard report review.

mod annotation;
mod category;
mod report;

pub use annotation::{AnnotationRecord, CategoryAnnotation, PerCategory, has_any_note};
pub use category::CategoryTag;
pub use report::{ActorId, AiClassification, HazardReport, ReportId};
