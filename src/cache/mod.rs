//! Local cache of computed prayer times.
//!
//! This module provides:
//! - A SQLite store keyed by calendar date with insert-or-replace writes
//! - Change notifications and a live `watch_all` stream for observers
//! - The staleness policy deciding when the cached window must be recomputed

mod staleness;
mod storage;

pub use staleness::{PolicyError, StalenessPolicy, DEFAULT_REFRESH_THRESHOLD_DAYS};
pub use storage::{PrayerTimeStore, StoreChange};
