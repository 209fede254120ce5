//! When the cached window must be recomputed.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use super::storage::PrayerTimeStore;
use crate::prayer::DEFAULT_WINDOW_DAYS;

/// Calendar days past the newest cached date at which a refresh is due
pub const DEFAULT_REFRESH_THRESHOLD_DAYS: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
  #[error("window must cover at least one day")]
  EmptyWindow,

  #[error(
    "refresh threshold ({threshold_days} days) must be shorter than the window ({window_days} days)"
  )]
  ThresholdNotBelowWindow { threshold_days: u32, window_days: u32 },
}

/// Decides from store metadata whether a refresh is due.
///
/// Invariant: `threshold_days < window_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
  threshold_days: u32,
  window_days: u32,
}

impl Default for StalenessPolicy {
  fn default() -> Self {
    Self {
      threshold_days: DEFAULT_REFRESH_THRESHOLD_DAYS,
      window_days: DEFAULT_WINDOW_DAYS,
    }
  }
}

impl StalenessPolicy {
  pub fn new(threshold_days: u32, window_days: u32) -> Result<Self, PolicyError> {
    if window_days == 0 {
      return Err(PolicyError::EmptyWindow);
    }
    if threshold_days >= window_days {
      return Err(PolicyError::ThresholdNotBelowWindow {
        threshold_days,
        window_days,
      });
    }
    Ok(Self {
      threshold_days,
      window_days,
    })
  }

  pub fn threshold_days(&self) -> u32 {
    self.threshold_days
  }

  /// Days a refresh writes, starting today
  pub fn window_days(&self) -> u32 {
    self.window_days
  }

  /// Stale when empty, when the newest date is unknown, or when
  /// `today - newest >= threshold` in whole calendar days.
  pub fn is_stale(&self, count: usize, newest: Option<NaiveDate>, today: NaiveDate) -> bool {
    if count == 0 {
      return true;
    }
    match newest {
      None => true,
      Some(newest) => (today - newest).num_days() >= i64::from(self.threshold_days),
    }
  }

  /// Ask the store. Read failures count as stale so a refresh gets a chance
  /// to repair the cache.
  pub fn should_refresh(&self, store: &PrayerTimeStore) -> bool {
    let metadata = store
      .count()
      .and_then(|count| Ok((count, store.newest_date()?)));

    match metadata {
      Ok((count, newest)) => self.is_stale(count, newest, store.today()),
      Err(e) => {
        warn!(error = %e, "Could not read cache metadata, treating cache as stale");
        true
      }
    }
  }
}
