use thiserror::Error;

/// Why a refresh failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefreshErrorKind {
  /// No location access. Only the user can fix this.
  #[error("location permission is missing")]
  PermissionMissing,

  /// No saved coordinates to compute for
  #[error("no location data available")]
  LocationUnavailable,

  /// Never returned as a failure: resolution falls back to the baseline method
  #[error("calculation method table unavailable")]
  MethodTableUnavailable,

  #[error("prayer time calculation failed")]
  ComputationFailed,

  #[error("could not save prayer times")]
  PersistenceFailed,
}

impl RefreshErrorKind {
  /// Whether trying again later, with no new input, can succeed
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      RefreshErrorKind::ComputationFailed | RefreshErrorKind::PersistenceFailed
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// The cached window is not stale yet
  Fresh,
  /// Another refresh is already running
  InFlight,
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  Success { written: usize },
  Skipped(SkipReason),
  Failed(RefreshErrorKind),
}

impl RefreshOutcome {
  pub fn is_success(&self) -> bool {
    matches!(self, RefreshOutcome::Success { .. })
  }

  pub fn error(&self) -> Option<RefreshErrorKind> {
    match self {
      RefreshOutcome::Failed(kind) => Some(*kind),
      _ => None,
    }
  }

  /// Message for interactive callers
  pub fn user_message(&self) -> String {
    match self {
      RefreshOutcome::Success { written } => {
        format!("Prayer times updated for the next {} days.", written)
      }
      RefreshOutcome::Skipped(SkipReason::Fresh) => "Prayer times are up to date.".to_string(),
      RefreshOutcome::Skipped(SkipReason::InFlight) => {
        "An update is already in progress.".to_string()
      }
      RefreshOutcome::Failed(RefreshErrorKind::PermissionMissing) => {
        "Location permission is required to calculate prayer times.".to_string()
      }
      RefreshOutcome::Failed(RefreshErrorKind::LocationUnavailable) => {
        "No location set. Set a location to calculate prayer times.".to_string()
      }
      RefreshOutcome::Failed(kind) => format!("Failed to update prayer times: {}.", kind),
    }
  }
}
