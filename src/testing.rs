//! Shared fixtures for unit tests.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use crate::cache::PrayerTimeStore;
use crate::clock::{Clock, LocalZone};
use crate::db::Database;
use crate::prayer::{
  AstronomicalEngine, CalculationMethod, Coordinates, DailyPrayerInstants, EngineError,
  TimeWindowComputer,
};

/// Clock that only moves when told to. Its calendar is UTC.
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn at(date: NaiveDate) -> Arc<Self> {
    let now = Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap());
    Arc::new(Self {
      now: Mutex::new(now),
    })
  }

  pub fn advance_days(&self, days: u64) {
    let mut now = self.now.lock().unwrap();
    *now = *now + Days::new(days);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }

  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }
}

/// Engine producing fixed UTC times, optionally failing on one date
#[derive(Default)]
pub struct StubEngine {
  pub fail_on: Option<NaiveDate>,
}

impl AstronomicalEngine for StubEngine {
  fn compute(
    &self,
    _coordinates: Coordinates,
    date: NaiveDate,
    _method: CalculationMethod,
  ) -> Result<DailyPrayerInstants, EngineError> {
    if self.fail_on == Some(date) {
      return Err(EngineError::new(format!("no solution for {}", date)));
    }
    let at = |h, m| Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).unwrap());
    Ok(DailyPrayerInstants {
      fajr: at(5, 2),
      sunrise: at(6, 40),
      dhuhr: at(12, 51),
      asr: at(15, 47),
      maghrib: at(19, 1),
      isha: at(20, 33),
    })
  }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn memory_store(clock: Arc<ManualClock>) -> Arc<PrayerTimeStore> {
  let db = Arc::new(Database::open_in_memory().unwrap());
  Arc::new(PrayerTimeStore::new(db, clock))
}

pub fn utc_computer(engine: StubEngine) -> TimeWindowComputer {
  TimeWindowComputer::new(Arc::new(engine)).with_zone(LocalZone::from_offset_minutes(0).unwrap())
}
