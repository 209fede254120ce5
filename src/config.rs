use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{StalenessPolicy, DEFAULT_REFRESH_THRESHOLD_DAYS};
use crate::clock::LocalZone;
use crate::logging::DEFAULT_LOG_LEVEL;
use crate::prayer::{Coordinates, DEFAULT_WINDOW_DAYS};
use crate::schedule::{Backoff, Constraints, PeriodicSchedule};

const APP_DIR: &str = "azan";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
  /// SQLite cache file (defaults to the platform data directory)
  pub database_path: Option<PathBuf>,
  /// Country → method JSON file (defaults to the bundled table)
  pub method_table: Option<PathBuf>,
  /// Default tracing level when RUST_LOG is not set
  pub log_level: Option<String>,
  /// Fixed UTC offset for local calendar days and times. System zone if unset.
  pub utc_offset_minutes: Option<i32>,
  #[serde(default)]
  pub window: WindowConfig,
  #[serde(default)]
  pub schedule: ScheduleConfig,
  /// Starting location, used only while none has been saved
  pub location: Option<LocationConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
  pub days: u32,
  pub refresh_threshold_days: u32,
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self {
      days: DEFAULT_WINDOW_DAYS,
      refresh_threshold_days: DEFAULT_REFRESH_THRESHOLD_DAYS,
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
  pub interval_days: u32,
  pub flex_days: u32,
  pub require_network: bool,
  pub skip_on_low_battery: bool,
  pub constraint_recheck_minutes: u32,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      interval_days: 40,
      flex_days: 1,
      require_network: true,
      skip_on_low_battery: true,
      constraint_recheck_minutes: 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocationConfig {
  pub latitude: f64,
  pub longitude: f64,
  pub country: Option<String>,
}

impl LocationConfig {
  pub fn coordinates(&self) -> Coordinates {
    Coordinates::new(self.latitude, self.longitude)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./azan.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/azan/config.yaml
  ///
  /// Without any file the defaults apply. An explicit path must exist.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("azan.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_DIR).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  /// Parse and validate YAML. An empty document yields the defaults.
  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = if contents.trim().is_empty() {
      Config::default()
    } else {
      serde_yaml::from_str(contents)?
    };
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    self.staleness_policy()?;
    self.zone()?;

    if self.schedule.interval_days == 0 {
      return Err(eyre!("schedule.interval_days must be at least 1"));
    }
    if self.schedule.flex_days >= self.schedule.interval_days {
      return Err(eyre!(
        "schedule.flex_days ({}) must be below schedule.interval_days ({})",
        self.schedule.flex_days,
        self.schedule.interval_days
      ));
    }
    if self.schedule.constraint_recheck_minutes == 0 {
      return Err(eyre!("schedule.constraint_recheck_minutes must be at least 1"));
    }
    if let Some(location) = &self.location {
      if !location.coordinates().is_valid() {
        return Err(eyre!(
          "location ({}) is out of range",
          location.coordinates()
        ));
      }
    }
    Ok(())
  }

  pub fn staleness_policy(&self) -> Result<StalenessPolicy> {
    StalenessPolicy::new(self.window.refresh_threshold_days, self.window.days)
      .map_err(|e| eyre!("window: {}", e))
  }

  pub fn zone(&self) -> Result<LocalZone> {
    match self.utc_offset_minutes {
      None => Ok(LocalZone::System),
      Some(minutes) => LocalZone::from_offset_minutes(minutes)
        .ok_or_else(|| eyre!("utc_offset_minutes {} is out of range", minutes)),
    }
  }

  pub fn periodic_schedule(&self) -> PeriodicSchedule {
    let day = 24 * 60 * 60;
    PeriodicSchedule {
      interval: Duration::from_secs(u64::from(self.schedule.interval_days) * day),
      flex: Duration::from_secs(u64::from(self.schedule.flex_days) * day),
      constraints: Constraints {
        require_network: self.schedule.require_network,
        skip_on_low_battery: self.schedule.skip_on_low_battery,
      },
      constraint_recheck: Duration::from_secs(
        u64::from(self.schedule.constraint_recheck_minutes) * 60,
      ),
      backoff: Backoff::default(),
    }
  }

  pub fn log_level(&self) -> &str {
    self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
  }

  /// Configured database path, or the platform default
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database_path {
      Some(path) => Ok(path.clone()),
      None => crate::db::Database::default_path().map_err(|e| eyre!("{}", e)),
    }
  }

  /// Log files live next to the database
  pub fn log_dir(&self) -> Result<PathBuf> {
    let db_path = self.database_path()?;
    Ok(
      db_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")),
    )
  }
}
