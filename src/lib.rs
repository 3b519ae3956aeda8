//! Hazard Review - annotation lifecycle core
//!
//! Tracks each safety-hazard report from its AI classification to a final
//! outcome: either a reviewer finalizes a human annotation, or the auto-confirm
//! countdown expires and the AI classification stands.

pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod repository;
pub mod sample_data;
pub mod store;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{ConfigError, ExpiryPolicy, LogLevel, ReviewConfig};
pub use countdown::{Countdown, CountdownState, Urgency};
pub use error::{Result, ReviewError};
pub use history::{EventLog, LifecycleEvent};
pub use lifecycle::{EditSession, LifecycleController, LifecycleState, SubscriptionId};
pub use lock::{EditLock, EditLockManager};
pub use model::{
    ActorId, AiClassification, AnnotationRecord, CategoryAnnotation, CategoryTag, HazardReport,
    PerCategory, ReportId,
};
pub use repository::{InMemoryReportRepository, ReportRepository};
pub use store::AnnotationStore;
pub use view::{LifecycleView, ReportSummary};
