//! Wall clock and local calendar.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};

/// Zone used for "today" and for formatting prayer times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
  /// Host time zone, including its DST rules
  #[default]
  System,
  /// Pinned UTC offset
  Fixed(FixedOffset),
}

impl LocalZone {
  /// Build a fixed zone from an offset in minutes east of UTC.
  pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
    FixedOffset::east_opt(minutes.checked_mul(60)?).map(LocalZone::Fixed)
  }

  /// Calendar date of an instant in this zone
  pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
    match self {
      LocalZone::System => instant.with_timezone(&Local).date_naive(),
      LocalZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
    }
  }

  /// 24-hour `HH:MM` rendering of an instant in this zone
  pub fn format_time(&self, instant: DateTime<Utc>) -> String {
    match self {
      LocalZone::System => instant.with_timezone(&Local).format("%H:%M").to_string(),
      LocalZone::Fixed(offset) => instant.with_timezone(offset).format("%H:%M").to_string(),
    }
  }
}

/// Source of the current instant and local calendar date.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
  zone: LocalZone,
}

impl SystemClock {
  pub fn new(zone: LocalZone) -> Self {
    Self { zone }
  }

  pub fn zone(&self) -> LocalZone {
    self.zone
  }
}

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn today(&self) -> NaiveDate {
    self.zone.date_of(Utc::now())
  }
}
