//! Country → calculation method table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::prayer::CalculationMethod;

/// Table shipped with the binary, used when no path is configured
pub const BUNDLED_TABLE: &str = include_str!("../../assets/country_prayer_methods.json");

#[derive(Debug, Error)]
pub enum TableError {
  #[error("Failed to read method table {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse method table: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Read-only mapping from country name to calculation method.
///
/// Keys are kept sorted, which makes iteration order (and so the fuzzy
/// lookup tie-break) alphabetical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryMethodTable {
  entries: BTreeMap<String, CalculationMethod>,
}

impl CountryMethodTable {
  /// Parse a JSON object of `"Country": "METHOD_ID"` pairs. Entries naming an
  /// unknown method are dropped.
  pub fn from_json(json: &str) -> Result<Self, TableError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(json)?;

    let entries = raw
      .into_iter()
      .filter_map(|(country, id)| match id.parse::<CalculationMethod>() {
        Ok(method) => Some((country, method)),
        Err(e) => {
          warn!(%country, error = %e, "Skipping method table entry");
          None
        }
      })
      .collect();

    Ok(Self { entries })
  }

  pub fn load(path: &Path) -> Result<Self, TableError> {
    let json = std::fs::read_to_string(path).map_err(|source| TableError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&json)
  }

  /// Table from `path` if given, else the bundled one.
  ///
  /// Never fails: an unreadable table degrades to an empty one, which makes
  /// every lookup fall back to the baseline method.
  pub fn load_or_empty(path: Option<&Path>) -> Self {
    let result = match path {
      Some(p) => Self::load(p),
      None => Self::from_json(BUNDLED_TABLE),
    };

    match result {
      Ok(table) => {
        debug!(countries = table.len(), "Loaded method table");
        table
      }
      Err(e) => {
        warn!(error = %e, "Method table unavailable, every country resolves to the baseline method");
        Self::default()
      }
    }
  }

  pub fn get(&self, country: &str) -> Option<CalculationMethod> {
    self.entries.get(country).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, CalculationMethod)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), *v))
  }

  /// Country names, alphabetically
  pub fn countries(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<(String, CalculationMethod)> for CountryMethodTable {
  fn from_iter<I: IntoIterator<Item = (String, CalculationMethod)>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_bundled_table_parses() {
    let table = CountryMethodTable::from_json(BUNDLED_TABLE).unwrap();
    assert!(!table.is_empty());
    assert_eq!(table.get("Egypt"), Some(CalculationMethod::Egyptian));
    assert_eq!(table.get("Saudi Arabia"), Some(CalculationMethod::UmmAlQura));
    assert_eq!(table.get("United States"), Some(CalculationMethod::NorthAmerica));
  }

  #[test]
  fn test_unknown_methods_are_dropped() {
    let table =
      CountryMethodTable::from_json(r#"{"Iran": "TEHRAN", "Qatar": "QATAR"}"#).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("Qatar"), Some(CalculationMethod::Qatar));
  }

  #[test]
  fn test_countries_are_sorted() {
    let table = CountryMethodTable::from_json(
      r#"{"Kuwait": "KUWAIT", "Egypt": "EGYPTIAN", "Singapore": "SINGAPORE"}"#,
    )
    .unwrap();
    assert_eq!(table.countries(), vec!["Egypt", "Kuwait", "Singapore"]);
  }

  #[test]
  fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"France": "MUSLIM_WORLD_LEAGUE"}}"#).unwrap();

    let table = CountryMethodTable::load(file.path()).unwrap();
    assert_eq!(table.get("France"), Some(CalculationMethod::MuslimWorldLeague));
  }

  #[test]
  fn test_unreadable_table_degrades_to_empty() {
    let missing = Path::new("/nonexistent/azan/methods.json");
    assert!(CountryMethodTable::load_or_empty(Some(missing)).is_empty());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(CountryMethodTable::load_or_empty(Some(file.path())).is_empty());
  }
}
