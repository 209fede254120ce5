//! Rolling offline cache of daily prayer times.
//!
//! The crate keeps a forward-looking window of prayer times in SQLite and
//! re-derives it before it runs dry:
//! - `method` maps a geocoded country name to a calculation method
//! - `prayer` computes a contiguous window of daily records
//! - `cache` persists the window and decides when it is stale
//! - `refresh` runs one refresh cycle and classifies its outcome
//! - `schedule` re-runs the refresh on a cadence under host constraints
//! - `service` bundles all of the above for a front end

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod location;
pub mod logging;
pub mod method;
pub mod prayer;
pub mod refresh;
pub mod schedule;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
