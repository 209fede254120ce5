//! Refresh cycle orchestration and its background job.

mod job;
mod orchestrator;
mod outcome;

pub use job::{RefreshJob, DEFAULT_COUNTRY};
pub(crate) use job::country_or_default;
pub use orchestrator::RefreshOrchestrator;
pub use outcome::{RefreshErrorKind, RefreshOutcome, SkipReason};
