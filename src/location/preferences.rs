use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::debug;

use crate::db::{Database, StoreError};
use crate::prayer::Coordinates;

const LATITUDE_KEY: &str = "latitude";
const LONGITUDE_KEY: &str = "longitude";
const COUNTRY_NAME_KEY: &str = "country_name";

/// Last-known coordinates and selected country, kept in the preferences table
pub struct LocationPreferences {
  db: Arc<Database>,
}

impl LocationPreferences {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  pub fn save_location(&self, coordinates: Coordinates) -> Result<(), StoreError> {
    self.db.with_conn(|conn| {
      let tx = conn.transaction()?;
      put(&tx, LATITUDE_KEY, &coordinates.latitude.to_string())?;
      put(&tx, LONGITUDE_KEY, &coordinates.longitude.to_string())?;
      tx.commit()?;
      Ok(())
    })?;
    debug!(%coordinates, "Saved location");
    Ok(())
  }

  pub fn save_location_with_country(
    &self,
    coordinates: Coordinates,
    country: &str,
  ) -> Result<(), StoreError> {
    let country = country.trim();
    self.db.with_conn(|conn| {
      let tx = conn.transaction()?;
      put(&tx, LATITUDE_KEY, &coordinates.latitude.to_string())?;
      put(&tx, LONGITUDE_KEY, &coordinates.longitude.to_string())?;
      put(&tx, COUNTRY_NAME_KEY, country)?;
      tx.commit()?;
      Ok(())
    })?;
    debug!(%coordinates, country, "Saved location with country");
    Ok(())
  }

  pub fn save_country(&self, country: &str) -> Result<(), StoreError> {
    let country = country.trim();
    self
      .db
      .with_conn(|conn| put(conn, COUNTRY_NAME_KEY, country))?;
    debug!(country, "Saved country name");
    Ok(())
  }

  /// Saved coordinates, present only when both halves are stored
  pub fn coordinates(&self) -> Result<Option<Coordinates>, StoreError> {
    let latitude = self.get_f64(LATITUDE_KEY)?;
    let longitude = self.get_f64(LONGITUDE_KEY)?;

    Ok(match (latitude, longitude) {
      (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
      _ => None,
    })
  }

  pub fn country(&self) -> Result<Option<String>, StoreError> {
    self.get(COUNTRY_NAME_KEY)
  }

  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    self.db.with_conn(|conn| {
      Ok(
        conn
          .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![key],
            |row| row.get(0),
          )
          .optional()?,
      )
    })
  }

  fn get_f64(&self, key: &'static str) -> Result<Option<f64>, StoreError> {
    match self.get(key)? {
      Some(value) => value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| StoreError::Corrupt { column: key, value }),
      None => Ok(None),
    }
  }
}

fn put(conn: &rusqlite::Connection, key: &str, value: &str) -> Result<(), StoreError> {
  conn.execute(
    "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
    params![key, value],
  )?;
  Ok(())
}
