//! One full refresh cycle: staleness check, method resolution, computation,
//! persistence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::outcome::{RefreshErrorKind, RefreshOutcome, SkipReason};
use crate::cache::{PrayerTimeStore, StalenessPolicy};
use crate::method::MethodResolver;
use crate::prayer::{Coordinates, TimeWindowComputer};

/// Runs refresh cycles against one store.
///
/// At most one refresh runs at a time; a concurrent call returns
/// `Skipped(InFlight)` instead of waiting. Nothing is retried here.
pub struct RefreshOrchestrator {
  store: Arc<PrayerTimeStore>,
  resolver: Arc<MethodResolver>,
  computer: TimeWindowComputer,
  policy: StalenessPolicy,
  in_flight: AtomicBool,
}

impl RefreshOrchestrator {
  pub fn new(
    store: Arc<PrayerTimeStore>,
    resolver: Arc<MethodResolver>,
    computer: TimeWindowComputer,
    policy: StalenessPolicy,
  ) -> Self {
    // Records are stamped by the same clock that decides "today"
    let computer = computer.with_clock(store.clock());
    Self {
      store,
      resolver,
      computer,
      policy,
      in_flight: AtomicBool::new(false),
    }
  }

  pub fn store(&self) -> &Arc<PrayerTimeStore> {
    &self.store
  }

  pub fn resolver(&self) -> &MethodResolver {
    &self.resolver
  }

  pub fn policy(&self) -> StalenessPolicy {
    self.policy
  }

  pub fn should_refresh(&self) -> bool {
    self.policy.should_refresh(&self.store)
  }

  /// Recompute and store the window starting today.
  ///
  /// Unless `force` is set, a fresh cache is left alone. The store is only
  /// written once the whole window has been computed.
  pub async fn refresh(
    &self,
    coordinates: Coordinates,
    country: &str,
    force: bool,
  ) -> RefreshOutcome {
    let Some(_token) = InFlightToken::acquire(&self.in_flight) else {
      debug!("Refresh already in flight");
      return RefreshOutcome::Skipped(SkipReason::InFlight);
    };

    if !force && !self.should_refresh() {
      debug!("No need to recalculate prayer times yet");
      return RefreshOutcome::Skipped(SkipReason::Fresh);
    }

    tokio::task::yield_now().await;

    let method = self.resolver.resolve(country);
    let today = self.store.today();
    let days = self.policy.window_days();

    let records = match self
      .computer
      .compute_window(coordinates, today, days, method)
    {
      Ok(records) => records,
      Err(e) => {
        error!(error = %e, %coordinates, "Error calculating prayer times");
        return RefreshOutcome::Failed(RefreshErrorKind::ComputationFailed);
      }
    };

    // Last point where cancellation leaves no trace
    tokio::task::yield_now().await;

    match self.store.upsert_window(&records) {
      Ok(written) => {
        info!(written, %method, start = %today, "Stored prayer times");
        RefreshOutcome::Success { written }
      }
      Err(e) => {
        error!(error = %e, "Error storing prayer times");
        RefreshOutcome::Failed(RefreshErrorKind::PersistenceFailed)
      }
    }
  }
}

/// Single-flight token, released on drop
struct InFlightToken<'a>(&'a AtomicBool);

impl<'a> InFlightToken<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for InFlightToken<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use crate::method::CountryMethodTable;
  use crate::prayer::CalculationMethod;
  use crate::clock::Clock;
  use crate::testing::{date, memory_store, utc_computer, ManualClock, StubEngine};

  fn france_resolver() -> Arc<MethodResolver> {
    let table = CountryMethodTable::from_json(r#"{"France": "MUSLIM_WORLD_LEAGUE"}"#).unwrap();
    Arc::new(MethodResolver::new(table))
  }

  fn paris() -> Coordinates {
    Coordinates::new(48.85, 2.35)
  }

  fn orchestrator(store: Arc<PrayerTimeStore>, engine: StubEngine) -> RefreshOrchestrator {
    RefreshOrchestrator::new(
      store,
      france_resolver(),
      utc_computer(engine),
      StalenessPolicy::default(),
    )
  }

  #[tokio::test]
  async fn test_end_to_end_refresh_then_skip() {
    let today = date(2026, 10, 19);
    let clock = ManualClock::at(today);
    let store = memory_store(clock.clone());
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    let outcome = orchestrator.refresh(paris(), "France", false).await;
    assert_eq!(outcome, RefreshOutcome::Success { written: 60 });

    let records = store.get_all().unwrap();
    assert_eq!(records.len(), 60);
    assert_eq!(records[0].date, today);
    assert!(records
      .iter()
      .all(|r| r.method == CalculationMethod::MuslimWorldLeague));
    assert!(!orchestrator.should_refresh());

    clock.advance_days(10);
    let outcome = orchestrator.refresh(paris(), "France", false).await;
    assert_eq!(outcome, RefreshOutcome::Skipped(SkipReason::Fresh));
  }

  #[tokio::test]
  async fn test_force_refreshes_fresh_cache() {
    let clock = ManualClock::at(date(2026, 10, 19));
    let store = memory_store(clock.clone());
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    orchestrator.refresh(paris(), "France", false).await;
    clock.advance_days(5);

    let outcome = orchestrator.refresh(paris(), "France", true).await;
    assert_eq!(outcome, RefreshOutcome::Success { written: 60 });
    assert_eq!(store.count().unwrap(), 65);
    assert_eq!(store.oldest_date().unwrap(), Some(date(2026, 10, 19)));
  }

  #[tokio::test]
  async fn test_computation_failure_leaves_store_untouched() {
    let today = date(2026, 10, 19);
    let clock = ManualClock::at(today);
    let store = memory_store(clock.clone());

    orchestrator(store.clone(), StubEngine::default())
      .refresh(paris(), "France", false)
      .await;
    let before = store.get_all().unwrap();

    let failing = orchestrator(
      store.clone(),
      StubEngine {
        fail_on: Some(date(2026, 11, 30)),
      },
    );
    let outcome = failing.refresh(paris(), "France", true).await;

    assert_eq!(
      outcome,
      RefreshOutcome::Failed(RefreshErrorKind::ComputationFailed)
    );
    assert_eq!(store.get_all().unwrap(), before);
  }

  #[tokio::test]
  async fn test_invalid_coordinates_fail_computation() {
    let store = memory_store(ManualClock::at(date(2026, 10, 19)));
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    let outcome = orchestrator
      .refresh(Coordinates::new(0.0, 500.0), "France", true)
      .await;

    assert_eq!(
      outcome,
      RefreshOutcome::Failed(RefreshErrorKind::ComputationFailed)
    );
    assert_eq!(store.count().unwrap(), 0);
  }

  #[tokio::test]
  async fn test_persistence_failure_is_classified() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.with_conn(|conn| Ok(conn.execute_batch("DROP TABLE prayer_times")?))
      .unwrap();
    let store = Arc::new(PrayerTimeStore::new(db, ManualClock::at(date(2026, 10, 19))));
    let orchestrator = orchestrator(store, StubEngine::default());

    let outcome = orchestrator.refresh(paris(), "France", true).await;
    assert_eq!(
      outcome,
      RefreshOutcome::Failed(RefreshErrorKind::PersistenceFailed)
    );
  }

  #[tokio::test]
  async fn test_concurrent_refresh_is_single_flight() {
    let store = memory_store(ManualClock::at(date(2026, 10, 19)));
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    let (a, b) = tokio::join!(
      orchestrator.refresh(paris(), "France", true),
      orchestrator.refresh(paris(), "France", true),
    );

    assert_eq!(a, RefreshOutcome::Success { written: 60 });
    assert_eq!(b, RefreshOutcome::Skipped(SkipReason::InFlight));

    // Token released afterwards
    let c = orchestrator.refresh(paris(), "France", true).await;
    assert!(c.is_success());
  }

  #[tokio::test]
  async fn test_records_are_stamped_by_store_clock() {
    let clock = ManualClock::at(date(2026, 10, 19));
    let store = memory_store(clock.clone());
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    orchestrator.refresh(paris(), "France", false).await;

    let records = store.get_all().unwrap();
    assert!(records.iter().all(|r| r.last_updated == clock.now()));
  }

  #[tokio::test]
  async fn test_cancelled_refresh_leaves_no_trace() {
    let store = memory_store(ManualClock::at(date(2026, 10, 19)));
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    {
      let mut refresh = Box::pin(orchestrator.refresh(paris(), "France", true));
      assert!(futures::poll!(&mut refresh).is_pending());
      assert!(futures::poll!(&mut refresh).is_pending());
    }

    assert_eq!(store.count().unwrap(), 0);
    let again = orchestrator.refresh(paris(), "France", true).await;
    assert_eq!(again, RefreshOutcome::Success { written: 60 });
  }

  #[tokio::test]
  async fn test_unknown_country_uses_baseline() {
    let store = memory_store(ManualClock::at(date(2026, 10, 19)));
    let orchestrator = orchestrator(store.clone(), StubEngine::default());

    orchestrator.refresh(paris(), "Atlantis", false).await;

    let today = store.get_today().unwrap().unwrap();
    assert_eq!(today.method, CalculationMethod::BASELINE);
  }
}
