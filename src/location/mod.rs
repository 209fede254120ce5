//! Where coordinates and country names come from.
//!
//! Device location and reverse geocoding are external collaborators; this
//! module only fixes their interfaces and persists what they last reported.

mod preferences;

use async_trait::async_trait;
use thiserror::Error;

use crate::prayer::Coordinates;

pub use preferences::LocationPreferences;

#[derive(Debug, Clone, Error)]
pub enum LocationError {
  #[error("Location permission required")]
  PermissionRequired,

  #[error("Location unavailable: {0}")]
  Unavailable(String),
}

/// Supplies the device's current coordinates
#[async_trait]
pub trait LocationProvider: Send + Sync {
  async fn current_coordinates(&self) -> Result<Coordinates, LocationError>;
}

/// Reverse geocoding from coordinates to a country name
#[async_trait]
pub trait Geocoder: Send + Sync {
  /// `None` when the country cannot be determined
  async fn country_from_coordinates(&self, coordinates: Coordinates) -> Option<String>;
}

/// Provider that reports coordinates given up front (manual entry)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
  async fn current_coordinates(&self) -> Result<Coordinates, LocationError> {
    Ok(self.0)
  }
}

/// Geocoder that answers with a country given up front, if any
#[derive(Debug, Clone, Default)]
pub struct FixedCountry(pub Option<String>);

#[async_trait]
impl Geocoder for FixedCountry {
  async fn country_from_coordinates(&self, _coordinates: Coordinates) -> Option<String> {
    self
      .0
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(String::from)
  }
}
