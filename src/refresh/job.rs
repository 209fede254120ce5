//! Background refresh run by the periodic scheduler.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::orchestrator::RefreshOrchestrator;
use super::outcome::{RefreshOutcome, SkipReason};
use crate::location::LocationPreferences;
use crate::schedule::{Job, JobResult};

/// Country assumed when none has been saved
pub const DEFAULT_COUNTRY: &str = "United States";

/// Saved country, or [`DEFAULT_COUNTRY`] when missing or blank
pub(crate) fn country_or_default(country: Option<String>) -> String {
  country
    .map(|c| c.trim().to_string())
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
}

/// Refreshes from saved preferences without user interaction.
pub struct RefreshJob {
  orchestrator: Arc<RefreshOrchestrator>,
  preferences: Arc<LocationPreferences>,
}

impl RefreshJob {
  pub fn new(orchestrator: Arc<RefreshOrchestrator>, preferences: Arc<LocationPreferences>) -> Self {
    Self {
      orchestrator,
      preferences,
    }
  }
}

#[async_trait]
impl Job for RefreshJob {
  async fn run(&self) -> JobResult {
    if !self.orchestrator.should_refresh() {
      debug!("Background refresh: cache is fresh");
      return JobResult::Success;
    }

    let coordinates = match self.preferences.coordinates() {
      Ok(Some(coordinates)) => coordinates,
      Ok(None) => {
        warn!("Background refresh: no saved location");
        return JobResult::Failure;
      }
      Err(e) => {
        error!(error = %e, "Background refresh: could not read saved location");
        return JobResult::Retry;
      }
    };

    let country = match self.preferences.country() {
      Ok(country) => country_or_default(country),
      Err(e) => {
        warn!(error = %e, "Background refresh: could not read saved country");
        DEFAULT_COUNTRY.to_string()
      }
    };

    let outcome = self.orchestrator.refresh(coordinates, &country, false).await;
    info!(?outcome, "Background refresh finished");

    match outcome {
      RefreshOutcome::Success { .. } | RefreshOutcome::Skipped(SkipReason::Fresh) => {
        JobResult::Success
      }
      // The other refresh may still fail; only a later check can tell
      RefreshOutcome::Skipped(SkipReason::InFlight) => JobResult::Retry,
      RefreshOutcome::Failed(kind) if kind.is_retryable() => JobResult::Retry,
      RefreshOutcome::Failed(_) => JobResult::Failure,
    }
  }
}
