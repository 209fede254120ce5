//! Boundary to the astronomical prayer-time formula.

use chrono::NaiveDate;
use thiserror::Error;

use super::types::{CalculationMethod, Coordinates, DailyPrayerInstants};

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EngineError(String);

impl EngineError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

/// Pure function from (location, date, method) to the day's prayer instants.
///
/// Implementations must be deterministic and free of side effects; the
/// window computer may call them from any task.
pub trait AstronomicalEngine: Send + Sync {
  fn compute(
    &self,
    coordinates: Coordinates,
    date: NaiveDate,
    method: CalculationMethod,
  ) -> Result<DailyPrayerInstants, EngineError>;
}

#[cfg(feature = "salah")]
pub use salah_engine::SalahEngine;

#[cfg(feature = "salah")]
mod salah_engine {
  use chrono::NaiveDate;
  use salah::prelude::{Configuration, Madhab, Method, Prayer, PrayerSchedule};

  use super::{AstronomicalEngine, EngineError};
  use crate::prayer::types::{CalculationMethod, Coordinates, DailyPrayerInstants};

  /// Engine backed by the `salah` crate
  #[derive(Debug, Clone, Copy)]
  pub struct SalahEngine {
    madhab: Madhab,
  }

  impl Default for SalahEngine {
    fn default() -> Self {
      Self {
        madhab: Madhab::Shafi,
      }
    }
  }

  fn salah_method(method: CalculationMethod) -> Method {
    match method {
      CalculationMethod::MuslimWorldLeague => Method::MuslimWorldLeague,
      CalculationMethod::Egyptian => Method::Egyptian,
      CalculationMethod::Karachi => Method::Karachi,
      CalculationMethod::UmmAlQura => Method::UmmAlQura,
      CalculationMethod::Dubai => Method::Dubai,
      CalculationMethod::Qatar => Method::Qatar,
      CalculationMethod::Kuwait => Method::Kuwait,
      CalculationMethod::Singapore => Method::Singapore,
      CalculationMethod::NorthAmerica => Method::NorthAmerica,
    }
  }

  impl AstronomicalEngine for SalahEngine {
    fn compute(
      &self,
      coordinates: Coordinates,
      date: NaiveDate,
      method: CalculationMethod,
    ) -> Result<DailyPrayerInstants, EngineError> {
      let location = salah::prelude::Coordinates::new(coordinates.latitude, coordinates.longitude);
      let params = Configuration::with(salah_method(method), self.madhab);

      let times = PrayerSchedule::new()
        .on(date)
        .for_location(location)
        .with_configuration(params)
        .calculate()
        .map_err(|e| EngineError::new(format!("{}", e)))?;

      Ok(DailyPrayerInstants {
        fajr: times.time(Prayer::Fajr),
        sunrise: times.time(Prayer::Sunrise),
        dhuhr: times.time(Prayer::Dhuhr),
        asr: times.time(Prayer::Asr),
        maghrib: times.time(Prayer::Maghrib),
        isha: times.time(Prayer::Isha),
      })
    }
  }
}
