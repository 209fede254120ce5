//! Host execution constraints: connectivity and battery.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Battery level (percent) at or below which a discharging battery counts as
/// critically low
pub const CRITICAL_BATTERY_PERCENT: u8 = 15;

/// Probe for the conditions a scheduled job may require.
pub trait HostConditions: Send + Sync {
  fn network_available(&self) -> bool;

  fn battery_critically_low(&self) -> bool;
}

/// Reads Linux sysfs (`/sys/class/net`, `/sys/class/power_supply`).
///
/// Where sysfs is missing the host is assumed connected and on mains power.
#[derive(Debug, Clone)]
pub struct SystemConditions {
  sysfs_class: PathBuf,
}

impl Default for SystemConditions {
  fn default() -> Self {
    Self::with_root("/sys/class")
  }
}

impl SystemConditions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Probe an alternative sysfs `class` directory
  pub fn with_root(path: impl Into<PathBuf>) -> Self {
    Self {
      sysfs_class: path.into(),
    }
  }

  fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
  }
}

impl HostConditions for SystemConditions {
  fn network_available(&self) -> bool {
    let Ok(entries) = fs::read_dir(self.sysfs_class.join("net")) else {
      return true;
    };

    entries.flatten().any(|entry| {
      let name = entry.file_name();
      if name == "lo" {
        return false;
      }
      let state = Self::read_trimmed(&entry.path().join("operstate"));
      trace!(interface = ?name, ?state, "Interface state");
      state.as_deref() == Some("up")
    })
  }

  fn battery_critically_low(&self) -> bool {
    let Ok(entries) = fs::read_dir(self.sysfs_class.join("power_supply")) else {
      return false;
    };

    entries.flatten().any(|entry| {
      let path = entry.path();
      if Self::read_trimmed(&path.join("type")).as_deref() != Some("Battery") {
        return false;
      }
      let discharging = Self::read_trimmed(&path.join("status")).as_deref() == Some("Discharging");
      let capacity = Self::read_trimmed(&path.join("capacity")).and_then(|c| c.parse::<u8>().ok());

      discharging && capacity.is_some_and(|c| c <= CRITICAL_BATTERY_PERCENT)
    })
  }
}
