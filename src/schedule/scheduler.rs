//! Named periodic jobs with constraints and retry backoff.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::conditions::HostConditions;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// What a job run tells the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
  /// Cycle complete; next run at the normal cadence
  Success,
  /// Try again after the backoff delay
  Retry,
  /// Stop; the schedule stays dead until replaced
  Failure,
}

/// Unit of work run by the scheduler.
#[async_trait]
pub trait Job: Send + Sync + 'static {
  async fn run(&self) -> JobResult;
}

/// What to do when a job with the same name is already scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingSchedulePolicy {
  /// Leave an active schedule alone
  #[default]
  Keep,
  /// Cancel it and start over
  Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
  /// Waiting for the next run or for constraints to clear
  Scheduled,
  Running,
  /// Waiting to retry after `attempt` consecutive failures
  Retrying { attempt: u32 },
  /// Stopped after a hard failure
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
  pub require_network: bool,
  pub skip_on_low_battery: bool,
}

impl Default for Constraints {
  fn default() -> Self {
    Self {
      require_network: true,
      skip_on_low_battery: true,
    }
  }
}

impl Constraints {
  fn satisfied(&self, conditions: &dyn HostConditions) -> bool {
    if self.require_network && !conditions.network_available() {
      return false;
    }
    if self.skip_on_low_battery && conditions.battery_critically_low() {
      return false;
    }
    true
  }
}

/// Exponential retry delay: `initial * 2^(attempt - 1)`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
  pub initial: Duration,
  pub max: Duration,
}

impl Default for Backoff {
  fn default() -> Self {
    Self {
      initial: Duration::from_secs(30),
      max: Duration::from_secs(5 * 60 * 60),
    }
  }
}

impl Backoff {
  pub fn delay(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    self
      .initial
      .checked_mul(1u32 << exponent)
      .unwrap_or(self.max)
      .min(self.max)
  }
}

/// Cadence and constraints of a periodic job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicSchedule {
  pub interval: Duration,
  /// Runs may start this much before `interval` has elapsed
  pub flex: Duration,
  pub constraints: Constraints,
  /// Wait between constraint checks while they are unmet
  pub constraint_recheck: Duration,
  pub backoff: Backoff,
}

impl Default for PeriodicSchedule {
  fn default() -> Self {
    Self {
      interval: 40 * DAY,
      flex: DAY,
      constraints: Constraints::default(),
      constraint_recheck: Duration::from_secs(60 * 60),
      backoff: Backoff::default(),
    }
  }
}

impl PeriodicSchedule {
  /// Delay from a completed cycle to the start of the next flex window
  pub fn next_run_delay(&self) -> Duration {
    self.interval.saturating_sub(self.flex)
  }
}

struct ScheduledJob {
  handle: JoinHandle<()>,
  status: watch::Receiver<ScheduleStatus>,
}

impl ScheduledJob {
  fn is_active(&self) -> bool {
    !self.handle.is_finished() && *self.status.borrow() != ScheduleStatus::Failed
  }
}

/// Runs named periodic jobs on the current tokio runtime.
///
/// A name identifies at most one schedule. The first run happens as soon as
/// constraints allow; later runs follow the schedule's cadence.
pub struct PeriodicScheduler {
  conditions: Arc<dyn HostConditions>,
  jobs: Mutex<HashMap<String, ScheduledJob>>,
}

impl PeriodicScheduler {
  pub fn new(conditions: Arc<dyn HostConditions>) -> Self {
    Self {
      conditions,
      jobs: Mutex::new(HashMap::new()),
    }
  }

  /// Schedule `job` under `name`.
  ///
  /// Returns `false` when `Keep` found an active schedule and left it in
  /// place. A schedule stopped by a hard failure is not active.
  pub fn enqueue(
    &self,
    name: &str,
    schedule: PeriodicSchedule,
    policy: ExistingSchedulePolicy,
    job: Arc<dyn Job>,
  ) -> bool {
    let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(existing) = jobs.get(name) {
      if policy == ExistingSchedulePolicy::Keep && existing.is_active() {
        debug!(job = name, "Keeping existing schedule");
        return false;
      }
      existing.handle.abort();
    }

    let (status_tx, status_rx) = watch::channel(ScheduleStatus::Scheduled);
    let handle = tokio::spawn(run_periodic(
      name.to_string(),
      schedule,
      job,
      Arc::clone(&self.conditions),
      status_tx,
    ));

    info!(
      job = name,
      interval_days = schedule.interval.as_secs() / DAY.as_secs(),
      "Scheduled periodic job"
    );
    jobs.insert(
      name.to_string(),
      ScheduledJob {
        handle,
        status: status_rx,
      },
    );
    true
  }

  /// Stop and forget the named job. Unknown names are ignored.
  pub fn cancel(&self, name: &str) {
    let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(job) = jobs.remove(name) {
      job.handle.abort();
      info!(job = name, "Cancelled periodic job");
    }
  }

  pub fn status(&self, name: &str) -> Option<ScheduleStatus> {
    let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
    jobs.get(name).map(|job| *job.status.borrow())
  }
}

impl Drop for PeriodicScheduler {
  fn drop(&mut self) {
    let jobs = self.jobs.get_mut().unwrap_or_else(PoisonError::into_inner);
    for job in jobs.values() {
      job.handle.abort();
    }
  }
}

async fn run_periodic(
  name: String,
  schedule: PeriodicSchedule,
  job: Arc<dyn Job>,
  conditions: Arc<dyn HostConditions>,
  status: watch::Sender<ScheduleStatus>,
) {
  let mut attempt = 0u32;

  loop {
    while !schedule.constraints.satisfied(conditions.as_ref()) {
      debug!(job = %name, "Constraints not met, deferring run");
      tokio::time::sleep(schedule.constraint_recheck).await;
    }

    status.send_replace(ScheduleStatus::Running);
    let result = job.run().await;

    match result {
      JobResult::Success => {
        attempt = 0;
        status.send_replace(ScheduleStatus::Scheduled);
        debug!(job = %name, "Cycle complete");
        tokio::time::sleep(schedule.next_run_delay()).await;
      }
      JobResult::Retry => {
        attempt = attempt.saturating_add(1);
        let delay = schedule.backoff.delay(attempt);
        status.send_replace(ScheduleStatus::Retrying { attempt });
        warn!(job = %name, attempt, ?delay, "Job asked to retry");
        tokio::time::sleep(delay).await;
      }
      JobResult::Failure => {
        status.send_replace(ScheduleStatus::Failed);
        warn!(job = %name, "Job failed permanently, schedule stopped");
        return;
      }
    }
  }
}
