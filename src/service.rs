//! Application-facing surface over the cache, refresh and scheduler.

use chrono::NaiveDate;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::StoreError;
use crate::location::{Geocoder, LocationError, LocationPreferences, LocationProvider};
use crate::prayer::{CalculationMethod, Coordinates, PrayerDayRecord};
use crate::refresh::{
  country_or_default, RefreshErrorKind, RefreshJob, RefreshOrchestrator, RefreshOutcome,
  DEFAULT_COUNTRY,
};
use crate::schedule::{
  ExistingSchedulePolicy, PeriodicSchedule, PeriodicScheduler, ScheduleStatus,
  PRAYER_TIME_UPDATE_WORK,
};

/// Size and date range of the cached window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSummary {
  pub records: usize,
  pub oldest: Option<NaiveDate>,
  pub newest: Option<NaiveDate>,
}

/// Everything a front end needs: interactive refresh, reads, and the
/// background schedule.
pub struct PrayerTimeService {
  orchestrator: Arc<RefreshOrchestrator>,
  preferences: Arc<LocationPreferences>,
  scheduler: Arc<PeriodicScheduler>,
  schedule: PeriodicSchedule,
}

impl PrayerTimeService {
  pub fn new(
    orchestrator: Arc<RefreshOrchestrator>,
    preferences: Arc<LocationPreferences>,
    scheduler: Arc<PeriodicScheduler>,
    schedule: PeriodicSchedule,
  ) -> Self {
    Self {
      orchestrator,
      preferences,
      scheduler,
      schedule,
    }
  }

  pub fn preferences(&self) -> &LocationPreferences {
    &self.preferences
  }

  /// Refresh from the saved location and country.
  ///
  /// A successful refresh also makes sure the periodic refresh is scheduled.
  pub async fn refresh(&self, force: bool) -> RefreshOutcome {
    let coordinates = match self.preferences.coordinates() {
      Ok(Some(coordinates)) => coordinates,
      Ok(None) => {
        warn!("No location data available");
        return RefreshOutcome::Failed(RefreshErrorKind::LocationUnavailable);
      }
      Err(e) => {
        error!(error = %e, "Could not read saved location");
        return RefreshOutcome::Failed(RefreshErrorKind::PersistenceFailed);
      }
    };

    let country = match self.preferences.country() {
      Ok(country) => country_or_default(country),
      Err(e) => {
        warn!(error = %e, "Could not read saved country");
        DEFAULT_COUNTRY.to_string()
      }
    };

    let outcome = self.orchestrator.refresh(coordinates, &country, force).await;
    if outcome.is_success() {
      self.schedule_periodic_refresh();
    }
    outcome
  }

  /// Ask for the current location, remember it, then force a refresh.
  ///
  /// When the geocoder cannot name a country the previously saved one is kept.
  pub async fn locate_and_refresh(
    &self,
    provider: &dyn LocationProvider,
    geocoder: &dyn Geocoder,
  ) -> RefreshOutcome {
    let coordinates = match provider.current_coordinates().await {
      Ok(coordinates) => coordinates,
      Err(LocationError::PermissionRequired) => {
        warn!("Location permission required");
        return RefreshOutcome::Failed(RefreshErrorKind::PermissionMissing);
      }
      Err(LocationError::Unavailable(reason)) => {
        warn!(%reason, "Location unavailable");
        return RefreshOutcome::Failed(RefreshErrorKind::LocationUnavailable);
      }
    };

    let saved = match geocoder.country_from_coordinates(coordinates).await {
      Some(country) => {
        info!(%coordinates, %country, "Located");
        self
          .preferences
          .save_location_with_country(coordinates, &country)
      }
      None => {
        info!(%coordinates, "Located, country unknown");
        self.preferences.save_location(coordinates)
      }
    };
    if let Err(e) = saved {
      error!(error = %e, "Could not save location");
      return RefreshOutcome::Failed(RefreshErrorKind::PersistenceFailed);
    }

    self.refresh(true).await
  }

  /// Save the selected country and recompute with it.
  ///
  /// Returns `None` when no location is saved yet, so there is nothing to
  /// recompute.
  pub async fn set_country(&self, country: &str) -> Result<Option<RefreshOutcome>, StoreError> {
    self.preferences.save_country(country)?;
    if self.preferences.coordinates()?.is_none() {
      debug!("Country saved, no location to refresh for");
      return Ok(None);
    }
    Ok(Some(self.refresh(true).await))
  }

  /// Store a starting location unless one is already saved.
  ///
  /// Returns whether anything was written.
  pub fn seed_location(
    &self,
    coordinates: Coordinates,
    country: Option<&str>,
  ) -> Result<bool, StoreError> {
    if self.preferences.coordinates()?.is_some() {
      return Ok(false);
    }
    match country {
      Some(country) => self
        .preferences
        .save_location_with_country(coordinates, country)?,
      None => self.preferences.save_location(coordinates)?,
    }
    debug!(%coordinates, "Seeded location");
    Ok(true)
  }

  pub fn today_record(&self) -> Result<Option<PrayerDayRecord>, StoreError> {
    self.orchestrator.store().get_today()
  }

  pub fn all_records(&self) -> Result<Vec<PrayerDayRecord>, StoreError> {
    self.orchestrator.store().get_all()
  }

  /// Live view of all records
  pub fn watch_records(
    &self,
  ) -> impl Stream<Item = Result<Vec<PrayerDayRecord>, StoreError>> + Send + 'static {
    self.orchestrator.store().watch_all()
  }

  pub fn should_refresh(&self) -> bool {
    self.orchestrator.should_refresh()
  }

  pub fn cache_summary(&self) -> Result<CacheSummary, StoreError> {
    let store = self.orchestrator.store();
    Ok(CacheSummary {
      records: store.count()?,
      oldest: store.oldest_date()?,
      newest: store.newest_date()?,
    })
  }

  /// Method a refresh would use for `country`
  pub fn method_for_country(&self, country: &str) -> CalculationMethod {
    self.orchestrator.resolver().resolve(country)
  }

  /// Schedule the background refresh, keeping an existing schedule.
  ///
  /// Must be called from within a tokio runtime.
  pub fn schedule_periodic_refresh(&self) -> bool {
    let job = RefreshJob::new(
      Arc::clone(&self.orchestrator),
      Arc::clone(&self.preferences),
    );
    self.scheduler.enqueue(
      PRAYER_TIME_UPDATE_WORK,
      self.schedule,
      ExistingSchedulePolicy::Keep,
      Arc::new(job),
    )
  }

  pub fn cancel_periodic_refresh(&self) {
    self.scheduler.cancel(PRAYER_TIME_UPDATE_WORK);
  }

  pub fn schedule_status(&self) -> Option<ScheduleStatus> {
    self.scheduler.status(PRAYER_TIME_UPDATE_WORK)
  }

  /// Country names with a known method, alphabetically
  pub fn available_countries(&self) -> Vec<String> {
    self.orchestrator.resolver().table().countries()
  }

  /// Drop every cached record. Saved location and country are kept.
  pub fn reset(&self) -> Result<(), StoreError> {
    self.orchestrator.store().clear_all()?;
    info!("Cleared cached prayer times");
    Ok(())
  }

  pub fn user_message(&self, outcome: &RefreshOutcome) -> String {
    outcome.user_message()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{PrayerTimeStore, StalenessPolicy};
  use crate::db::Database;
  use crate::location::{FixedCountry, FixedLocation};
  use crate::method::{CountryMethodTable, MethodResolver};
  use crate::prayer::CalculationMethod;
  use crate::refresh::SkipReason;
  use crate::schedule::HostConditions;
  use crate::testing::{date, utc_computer, ManualClock, StubEngine};
  use async_trait::async_trait;
  use futures::StreamExt;

  struct AlwaysGood;

  impl HostConditions for AlwaysGood {
    fn network_available(&self) -> bool {
      true
    }

    fn battery_critically_low(&self) -> bool {
      false
    }
  }

  struct DeniedLocation;

  #[async_trait]
  impl LocationProvider for DeniedLocation {
    async fn current_coordinates(&self) -> Result<Coordinates, LocationError> {
      Err(LocationError::PermissionRequired)
    }
  }

  struct BrokenLocation;

  #[async_trait]
  impl LocationProvider for BrokenLocation {
    async fn current_coordinates(&self) -> Result<Coordinates, LocationError> {
      Err(LocationError::Unavailable("no fix".into()))
    }
  }

  fn service() -> PrayerTimeService {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let store = Arc::new(PrayerTimeStore::new(
      db.clone(),
      ManualClock::at(date(2026, 10, 19)),
    ));
    let table = CountryMethodTable::from_json(
      r#"{"Egypt": "EGYPTIAN", "United States": "NORTH_AMERICA", "Pakistan": "KARACHI"}"#,
    )
    .unwrap();
    let orchestrator = Arc::new(RefreshOrchestrator::new(
      store,
      Arc::new(MethodResolver::new(table)),
      utc_computer(StubEngine::default()),
      StalenessPolicy::default(),
    ));
    PrayerTimeService::new(
      orchestrator,
      Arc::new(LocationPreferences::new(db)),
      Arc::new(PeriodicScheduler::new(Arc::new(AlwaysGood))),
      PeriodicSchedule::default(),
    )
  }

  fn cairo() -> Coordinates {
    Coordinates::new(30.04, 31.24)
  }

  #[tokio::test]
  async fn test_refresh_without_location() {
    let service = service();
    let outcome = service.refresh(false).await;
    assert_eq!(
      outcome,
      RefreshOutcome::Failed(RefreshErrorKind::LocationUnavailable)
    );
    assert_eq!(service.schedule_status(), None);
  }

  #[tokio::test]
  async fn test_locate_and_refresh_saves_and_schedules() {
    let service = service();
    let outcome = service
      .locate_and_refresh(&FixedLocation(cairo()), &FixedCountry(Some("Egypt".into())))
      .await;

    assert_eq!(outcome, RefreshOutcome::Success { written: 60 });
    assert_eq!(service.preferences().coordinates().unwrap(), Some(cairo()));
    assert_eq!(
      service.preferences().country().unwrap().as_deref(),
      Some("Egypt")
    );
    assert_eq!(
      service.today_record().unwrap().unwrap().method,
      CalculationMethod::Egyptian
    );
    assert!(service.schedule_status().is_some());
    assert!(!service.should_refresh());
  }

  #[tokio::test]
  async fn test_unknown_country_keeps_saved_one() {
    let service = service();
    service.preferences().save_country("Pakistan").unwrap();

    service
      .locate_and_refresh(&FixedLocation(cairo()), &FixedCountry(None))
      .await;

    assert_eq!(
      service.preferences().country().unwrap().as_deref(),
      Some("Pakistan")
    );
    assert_eq!(
      service.today_record().unwrap().unwrap().method,
      CalculationMethod::Karachi
    );
  }

  #[tokio::test]
  async fn test_location_errors_are_classified() {
    let service = service();
    let denied = service
      .locate_and_refresh(&DeniedLocation, &FixedCountry(None))
      .await;
    assert_eq!(
      denied,
      RefreshOutcome::Failed(RefreshErrorKind::PermissionMissing)
    );

    let broken = service
      .locate_and_refresh(&BrokenLocation, &FixedCountry(None))
      .await;
    assert_eq!(
      broken,
      RefreshOutcome::Failed(RefreshErrorKind::LocationUnavailable)
    );
    assert_eq!(service.all_records().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn test_blank_country_uses_default() {
    let service = service();
    service.seed_location(cairo(), None).unwrap();

    assert!(service.refresh(false).await.is_success());
    assert_eq!(
      service.today_record().unwrap().unwrap().method,
      CalculationMethod::NorthAmerica
    );
    assert_eq!(
      service.refresh(false).await,
      RefreshOutcome::Skipped(SkipReason::Fresh)
    );
  }

  #[tokio::test]
  async fn test_set_country_forces_refresh() {
    let service = service();
    assert_eq!(service.set_country("Egypt").await.unwrap(), None);

    service.seed_location(cairo(), None).unwrap();
    service.refresh(false).await;

    let outcome = service.set_country("  Pakistan ").await.unwrap();
    assert_eq!(outcome, Some(RefreshOutcome::Success { written: 60 }));
    assert_eq!(
      service.today_record().unwrap().unwrap().method,
      CalculationMethod::Karachi
    );
  }

  #[tokio::test]
  async fn test_seed_location_does_not_overwrite() {
    let service = service();
    assert!(service.seed_location(cairo(), Some("Egypt")).unwrap());
    assert!(!service
      .seed_location(Coordinates::new(1.0, 2.0), Some("Pakistan"))
      .unwrap());
    assert_eq!(service.preferences().coordinates().unwrap(), Some(cairo()));
  }

  #[tokio::test]
  async fn test_reset_and_watch() {
    let service = service();
    service.seed_location(cairo(), Some("Egypt")).unwrap();
    service.refresh(false).await;

    let mut records = Box::pin(service.watch_records());
    assert_eq!(records.next().await.unwrap().unwrap().len(), 60);

    assert_eq!(
      service.cache_summary().unwrap(),
      CacheSummary {
        records: 60,
        oldest: Some(date(2026, 10, 19)),
        newest: Some(date(2026, 12, 17)),
      }
    );

    service.reset().unwrap();
    assert!(service.should_refresh());
    assert_eq!(service.cache_summary().unwrap().records, 0);
    assert!(records.next().await.unwrap().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_cancel_and_countries() {
    let service = service();
    assert!(service.schedule_periodic_refresh());
    assert!(!service.schedule_periodic_refresh());
    service.cancel_periodic_refresh();
    assert_eq!(service.schedule_status(), None);

    assert_eq!(
      service.available_countries(),
      vec!["Egypt", "Pakistan", "United States"]
    );
    assert_eq!(service.method_for_country("USA"), CalculationMethod::NorthAmerica);
    assert_eq!(service.method_for_country("Atlantis"), CalculationMethod::BASELINE);
  }
}
