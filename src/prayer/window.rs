//! Batch computation of a contiguous window of daily records.

use chrono::{DateTime, Days, NaiveDate, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::engine::{AstronomicalEngine, EngineError};
use super::types::{CalculationMethod, Coordinates, PrayerDayRecord};
use crate::clock::{Clock, LocalZone, SystemClock};

/// Days cached ahead of today by a refresh
pub const DEFAULT_WINDOW_DAYS: u32 = 60;

#[derive(Debug, Error)]
pub enum ComputeError {
  #[error("Invalid coordinates: {0}")]
  InvalidCoordinates(Coordinates),

  #[error("Date range overflows the calendar after {0}")]
  DateOverflow(NaiveDate),

  #[error("Astronomical engine failed for {date}: {source}")]
  Engine {
    date: NaiveDate,
    #[source]
    source: EngineError,
  },
}

/// Produces one `PrayerDayRecord` per date for a run of consecutive days.
#[derive(Clone)]
pub struct TimeWindowComputer {
  engine: Arc<dyn AstronomicalEngine>,
  zone: LocalZone,
  clock: Arc<dyn Clock>,
}

impl TimeWindowComputer {
  pub fn new(engine: Arc<dyn AstronomicalEngine>) -> Self {
    Self {
      engine,
      zone: LocalZone::System,
      clock: Arc::new(SystemClock::default()),
    }
  }

  /// Set the zone prayer times are rendered in.
  pub fn with_zone(mut self, zone: LocalZone) -> Self {
    self.zone = zone;
    self
  }

  /// Set the clock that stamps `last_updated`.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Compute `num_days` records starting at `start`.
  ///
  /// Either every date succeeds or the whole call fails; no partial window is
  /// ever returned.
  pub fn compute_window(
    &self,
    coordinates: Coordinates,
    start: NaiveDate,
    num_days: u32,
    method: CalculationMethod,
  ) -> Result<Vec<PrayerDayRecord>, ComputeError> {
    if !coordinates.is_valid() {
      return Err(ComputeError::InvalidCoordinates(coordinates));
    }

    // Millisecond precision survives the round trip through the store
    let computed_at = self.clock.now().trunc_subsecs(3);

    debug!(
      %coordinates,
      %start,
      num_days,
      %method,
      "Computing prayer time window"
    );

    (0..num_days)
      .map(|offset| {
        let date = start
          .checked_add_days(Days::new(u64::from(offset)))
          .ok_or(ComputeError::DateOverflow(start))?;
        self.compute_day(coordinates, date, method, computed_at)
      })
      .collect()
  }

  fn compute_day(
    &self,
    coordinates: Coordinates,
    date: NaiveDate,
    method: CalculationMethod,
    computed_at: DateTime<Utc>,
  ) -> Result<PrayerDayRecord, ComputeError> {
    let instants = self
      .engine
      .compute(coordinates, date, method)
      .map_err(|source| ComputeError::Engine { date, source })?;

    Ok(PrayerDayRecord {
      date,
      fajr: self.zone.format_time(instants.fajr),
      sunrise: self.zone.format_time(instants.sunrise),
      dhuhr: self.zone.format_time(instants.dhuhr),
      asr: self.zone.format_time(instants.asr),
      maghrib: self.zone.format_time(instants.maghrib),
      isha: self.zone.format_time(instants.isha),
      method,
      last_updated: computed_at,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{date, utc_computer, ManualClock, StubEngine};

  fn paris() -> Coordinates {
    Coordinates::new(48.85, 2.35)
  }

  #[test]
  fn test_window_is_contiguous_for_every_length() {
    let computer = utc_computer(StubEngine::default());
    let start = date(2026, 12, 20);

    for n in 1..=DEFAULT_WINDOW_DAYS {
      let records = computer
        .compute_window(paris(), start, n, CalculationMethod::BASELINE)
        .unwrap();

      assert_eq!(records.len(), n as usize);
      assert_eq!(records[0].date, start);
      for pair in records.windows(2) {
        assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
      }
    }
  }

  #[test]
  fn test_times_are_24_hour_local_strings() {
    let computer = utc_computer(StubEngine::default())
      .with_zone(LocalZone::from_offset_minutes(60).unwrap());

    let records = computer
      .compute_window(paris(), date(2026, 1, 1), 1, CalculationMethod::Egyptian)
      .unwrap();

    let day = &records[0];
    assert_eq!(day.fajr, "06:02");
    assert_eq!(day.maghrib, "20:01");
    assert_eq!(day.isha, "21:33");
    assert_eq!(day.method, CalculationMethod::Egyptian);
  }

  #[test]
  fn test_engine_failure_fails_whole_window() {
    let computer = utc_computer(StubEngine {
      fail_on: Some(date(2026, 2, 10)),
    });

    let result = computer.compute_window(paris(), date(2026, 2, 1), 60, CalculationMethod::BASELINE);

    match result {
      Err(ComputeError::Engine { date: failed, .. }) => assert_eq!(failed, date(2026, 2, 10)),
      other => panic!("expected engine failure, got {:?}", other.map(|r| r.len())),
    }
  }

  #[test]
  fn test_invalid_coordinates_rejected() {
    let computer = utc_computer(StubEngine::default());
    let result = computer.compute_window(
      Coordinates::new(120.0, 0.0),
      date(2026, 1, 1),
      3,
      CalculationMethod::BASELINE,
    );
    assert!(matches!(result, Err(ComputeError::InvalidCoordinates(_))));
  }

  #[test]
  fn test_last_updated_comes_from_clock() {
    let clock = ManualClock::at(date(2026, 3, 14));
    let computer = utc_computer(StubEngine::default()).with_clock(clock.clone());

    let records = computer
      .compute_window(paris(), date(2026, 3, 14), 3, CalculationMethod::BASELINE)
      .unwrap();

    assert!(records.iter().all(|r| r.last_updated == clock.now()));
  }

  #[test]
  fn test_zero_days_is_empty() {
    let computer = utc_computer(StubEngine::default());
    let records = computer
      .compute_window(paris(), date(2026, 1, 1), 0, CalculationMethod::BASELINE)
      .unwrap();
    assert!(records.is_empty());
  }
}
