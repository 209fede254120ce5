//! Prayer-time records and the computation of a forward-looking window.

mod engine;
mod types;
mod window;

#[cfg(feature = "salah")]
pub use engine::SalahEngine;
pub use engine::{AstronomicalEngine, EngineError};
pub use types::{
  CalculationMethod, Coordinates, DailyPrayerInstants, PrayerDayRecord, UnknownMethod,
};
pub use window::{ComputeError, TimeWindowComputer, DEFAULT_WINDOW_DAYS};
