use azan::cache::{PrayerTimeStore, StalenessPolicy};
use azan::clock::SystemClock;
use azan::config::Config;
use azan::db::Database;
use azan::location::{FixedCountry, FixedLocation, LocationPreferences};
use azan::logging;
use azan::method::{CountryMethodTable, MethodResolver};
use azan::prayer::{
  AstronomicalEngine, CalculationMethod, Coordinates, DailyPrayerInstants, EngineError,
  PrayerDayRecord, TimeWindowComputer,
};
use azan::refresh::{RefreshOrchestrator, RefreshOutcome};
use azan::schedule::{PeriodicScheduler, SystemConditions};
use azan::service::PrayerTimeService;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "azan")]
#[command(about = "Offline cache of daily prayer times")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/azan/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Recompute the window from the saved location if it is stale
  Refresh {
    /// Recompute even when the cache is fresh
    #[arg(long)]
    force: bool,
  },
  /// Save a location and recompute for it
  Locate {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    /// Country name; the saved one is kept when omitted
    #[arg(long)]
    country: Option<String>,
  },
  /// Select the country used to pick the calculation method
  Country { name: String },
  /// Show today's prayer times
  Today,
  /// Show every cached day
  List,
  /// Show cache and location state
  Status,
  /// List countries with a known calculation method
  Countries,
  /// Keep the cache fresh in the background until interrupted
  Daemon,
  /// Delete all cached prayer times
  Reset,
}

impl Command {
  fn needs_engine(&self) -> bool {
    matches!(
      self,
      Command::Refresh { .. } | Command::Locate { .. } | Command::Country { .. } | Command::Daemon
    )
  }
}

/// Stands in when no engine is compiled in; every computation fails
struct MissingEngine;

impl AstronomicalEngine for MissingEngine {
  fn compute(
    &self,
    _coordinates: Coordinates,
    _date: NaiveDate,
    _method: CalculationMethod,
  ) -> Result<DailyPrayerInstants, EngineError> {
    Err(EngineError::new("no astronomical engine compiled in"))
  }
}

#[cfg(feature = "salah")]
fn compiled_engine() -> Option<Arc<dyn AstronomicalEngine>> {
  Some(Arc::new(azan::prayer::SalahEngine::default()))
}

#[cfg(not(feature = "salah"))]
fn compiled_engine() -> Option<Arc<dyn AstronomicalEngine>> {
  None
}

fn build_service(config: &Config, engine: Arc<dyn AstronomicalEngine>) -> Result<PrayerTimeService> {
  let zone = config.zone()?;
  let policy: StalenessPolicy = config.staleness_policy()?;

  let db = Arc::new(Database::open(&config.database_path()?)?);
  let store = Arc::new(PrayerTimeStore::new(
    Arc::clone(&db),
    Arc::new(SystemClock::new(zone)),
  ));
  let table = CountryMethodTable::load_or_empty(config.method_table.as_deref());
  let orchestrator = Arc::new(RefreshOrchestrator::new(
    store,
    Arc::new(MethodResolver::new(table)),
    TimeWindowComputer::new(engine).with_zone(zone),
    policy,
  ));
  let scheduler = Arc::new(PeriodicScheduler::new(Arc::new(SystemConditions::new())));

  let service = PrayerTimeService::new(
    orchestrator,
    Arc::new(LocationPreferences::new(db)),
    scheduler,
    config.periodic_schedule(),
  );

  if let Some(location) = &config.location {
    service.seed_location(location.coordinates(), location.country.as_deref())?;
  }
  Ok(service)
}

fn report(service: &PrayerTimeService, outcome: RefreshOutcome) -> Result<()> {
  let message = service.user_message(&outcome);
  if outcome.error().is_some() {
    return Err(eyre!(message));
  }
  println!("{}", message);
  Ok(())
}

fn print_day(record: &PrayerDayRecord) {
  println!("{} ({})", record.date, record.method);
  for (name, time) in record.times() {
    println!("  {:<8} {}", name, time);
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let _log_guard = logging::init_logging(&config.log_dir()?, config.log_level())?;

  let engine = compiled_engine();
  if engine.is_none() && args.command.needs_engine() {
    return Err(eyre!(
      "No astronomical engine compiled in. Rebuild with `--features salah`."
    ));
  }
  let service = build_service(&config, engine.unwrap_or_else(|| Arc::new(MissingEngine)))?;

  match args.command {
    Command::Refresh { force } => {
      let outcome = service.refresh(force).await;
      report(&service, outcome)?;
    }
    Command::Locate { lat, lon, country } => {
      let coordinates = Coordinates::new(lat, lon);
      if !coordinates.is_valid() {
        return Err(eyre!("Coordinates out of range: {}", coordinates));
      }
      let outcome = service
        .locate_and_refresh(&FixedLocation(coordinates), &FixedCountry(country))
        .await;
      report(&service, outcome)?;
    }
    Command::Country { name } => match service.set_country(&name).await? {
      Some(outcome) => report(&service, outcome)?,
      None => println!("Country saved. Set a location to calculate prayer times."),
    },
    Command::Today => match service.today_record()? {
      Some(record) => print_day(&record),
      None => println!("No prayer times cached for today. Run `azan refresh`."),
    },
    Command::List => {
      for record in service.all_records()? {
        let times: Vec<&str> = record.times().iter().map(|(_, time)| *time).collect();
        println!("{}  {}  {}", record.date, times.join("  "), record.method);
      }
    }
    Command::Status => {
      let summary = service.cache_summary()?;
      let preferences = service.preferences();
      let country = preferences.country()?;

      match preferences.coordinates()? {
        Some(coordinates) => println!("Location:  {}", coordinates),
        None => println!("Location:  not set"),
      }
      println!(
        "Country:   {}",
        country.as_deref().unwrap_or("not set (United States assumed)")
      );
      println!(
        "Method:    {}",
        service.method_for_country(country.as_deref().unwrap_or(azan::refresh::DEFAULT_COUNTRY))
      );
      match (summary.oldest, summary.newest) {
        (Some(oldest), Some(newest)) => {
          println!("Cached:    {} days ({} to {})", summary.records, oldest, newest)
        }
        _ => println!("Cached:    nothing"),
      }
      println!(
        "Refresh:   {}",
        if service.should_refresh() {
          "due"
        } else {
          "not needed"
        }
      );
    }
    Command::Countries => {
      for country in service.available_countries() {
        println!("{} ({})", country, service.method_for_country(&country));
      }
    }
    Command::Daemon => {
      service.schedule_periodic_refresh();
      info!("Background refresh scheduled, waiting for Ctrl-C");
      tokio::signal::ctrl_c().await?;
      service.cancel_periodic_refresh();
      info!("Shutting down");
    }
    Command::Reset => {
      service.reset()?;
      println!("Cached prayer times deleted.");
    }
  }

  Ok(())
}
