use tracing::{debug, info, warn};

use super::aliases::normalize_country_name;
use super::table::CountryMethodTable;
use crate::prayer::CalculationMethod;

/// Maps free-form country names to a calculation method.
///
/// Resolution never fails; anything unresolvable gets
/// `CalculationMethod::BASELINE`.
#[derive(Debug, Clone, Default)]
pub struct MethodResolver {
  table: CountryMethodTable,
}

impl MethodResolver {
  pub fn new(table: CountryMethodTable) -> Self {
    Self { table }
  }

  pub fn table(&self) -> &CountryMethodTable {
    &self.table
  }

  /// Resolve a country name:
  /// 1. Normalize through the alias rules
  /// 2. Exact lookup
  /// 3. Case-insensitive scan over normalized table keys
  /// 4. Baseline
  pub fn resolve(&self, raw_country: &str) -> CalculationMethod {
    let trimmed = raw_country.trim();
    if trimmed.is_empty() {
      debug!("Empty country name, using baseline method");
      return CalculationMethod::BASELINE;
    }

    let normalized = normalize_country_name(trimmed);
    info!(country = trimmed, %normalized, "Detected country");

    if let Some(method) = self.table.get(&normalized) {
      debug!(%normalized, %method, "Found calculation method");
      return method;
    }

    let wanted = normalized.to_lowercase();
    let fuzzy = self
      .table
      .iter()
      .find(|(key, _)| normalize_country_name(key).to_lowercase() == wanted);

    if let Some((matched, method)) = fuzzy {
      debug!(%normalized, matched, %method, "Found matching country");
      return method;
    }

    warn!(
      %normalized,
      "Country not found in method table, using {}",
      CalculationMethod::BASELINE
    );
    CalculationMethod::BASELINE
  }
}
