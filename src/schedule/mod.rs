//! Background scheduling of the periodic refresh.

mod conditions;
mod scheduler;

pub use conditions::{HostConditions, SystemConditions, CRITICAL_BATTERY_PERCENT};
pub use scheduler::{
  Backoff, Constraints, ExistingSchedulePolicy, Job, JobResult, PeriodicSchedule,
  PeriodicScheduler, ScheduleStatus,
};

/// Unique name of the periodic prayer-time refresh
pub const PRAYER_TIME_UPDATE_WORK: &str = "prayer_time_update_work";
