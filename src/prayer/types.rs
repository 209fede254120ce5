use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub latitude: f64,
  pub longitude: f64,
}

impl Coordinates {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self {
      latitude,
      longitude,
    }
  }

  /// Latitude within [-90, 90] and longitude within [-180, 180]
  pub fn is_valid(&self) -> bool {
    self.latitude.is_finite()
      && self.longitude.is_finite()
      && (-90.0..=90.0).contains(&self.latitude)
      && (-180.0..=180.0).contains(&self.longitude)
  }
}

impl fmt::Display for Coordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
  }
}

/// Named parameter set for the astronomical prayer-time formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationMethod {
  /// Baseline used whenever a country cannot be resolved
  #[default]
  MuslimWorldLeague,
  Egyptian,
  Karachi,
  UmmAlQura,
  Dubai,
  Qatar,
  Kuwait,
  Singapore,
  NorthAmerica,
}

impl CalculationMethod {
  pub const BASELINE: CalculationMethod = CalculationMethod::MuslimWorldLeague;

  pub const ALL: [CalculationMethod; 9] = [
    CalculationMethod::MuslimWorldLeague,
    CalculationMethod::Egyptian,
    CalculationMethod::Karachi,
    CalculationMethod::UmmAlQura,
    CalculationMethod::Dubai,
    CalculationMethod::Qatar,
    CalculationMethod::Kuwait,
    CalculationMethod::Singapore,
    CalculationMethod::NorthAmerica,
  ];

  /// Identifier used in the country table asset and in the store
  pub fn id(&self) -> &'static str {
    match self {
      CalculationMethod::MuslimWorldLeague => "MUSLIM_WORLD_LEAGUE",
      CalculationMethod::Egyptian => "EGYPTIAN",
      CalculationMethod::Karachi => "KARACHI",
      CalculationMethod::UmmAlQura => "UMM_AL_QURA",
      CalculationMethod::Dubai => "DUBAI",
      CalculationMethod::Qatar => "QATAR",
      CalculationMethod::Kuwait => "KUWAIT",
      CalculationMethod::Singapore => "SINGAPORE",
      CalculationMethod::NorthAmerica => "NORTH_AMERICA",
    }
  }
}

impl fmt::Display for CalculationMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown calculation method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for CalculationMethod {
  type Err = UnknownMethod;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let id = s.trim();
    Self::ALL
      .into_iter()
      .find(|m| m.id().eq_ignore_ascii_case(id))
      .ok_or_else(|| UnknownMethod(s.to_string()))
  }
}

/// One calendar date's prayer times.
///
/// Times are local `HH:MM` strings. A record is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerDayRecord {
  pub date: NaiveDate,
  pub fajr: String,
  pub sunrise: String,
  pub dhuhr: String,
  pub asr: String,
  pub maghrib: String,
  pub isha: String,
  pub method: CalculationMethod,
  pub last_updated: DateTime<Utc>,
}

impl PrayerDayRecord {
  /// (name, time) pairs in the order the prayers occur
  pub fn times(&self) -> [(&'static str, &str); 6] {
    [
      ("Fajr", &self.fajr),
      ("Sunrise", &self.sunrise),
      ("Dhuhr", &self.dhuhr),
      ("Asr", &self.asr),
      ("Maghrib", &self.maghrib),
      ("Isha", &self.isha),
    ]
  }
}

/// Absolute instants returned by the astronomical engine for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPrayerInstants {
  pub fajr: DateTime<Utc>,
  pub sunrise: DateTime<Utc>,
  pub dhuhr: DateTime<Utc>,
  pub asr: DateTime<Utc>,
  pub maghrib: DateTime<Utc>,
  pub isha: DateTime<Utc>,
}
