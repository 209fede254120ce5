pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised by the SQLite-backed stores
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Database lock poisoned")]
  LockPoisoned,

  #[error("Failed to create database directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Could not determine data directory")]
  NoDataDir,

  #[error("Corrupt value in column {column}: {value}")]
  Corrupt { column: &'static str, value: String },
}

/// Database connection wrapper shared by the prayer-time store and preferences
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at `path`
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let conn = Connection::open(path)?;
    Self::with_connection(conn)
  }

  /// Private in-memory database, gone when dropped
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;
    Ok(db)
  }

  /// Get the default database path
  pub fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(StoreError::NoDataDir)?;

    Ok(data_dir.join("azan").join("cache.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<(), StoreError> {
    self.with_conn(|conn| Ok(conn.execute_batch(schema::SCHEMA)?))
  }

  /// Run `f` with exclusive access to the connection.
  ///
  /// The lock is released when `f` returns; never call this across an await.
  pub fn with_conn<T>(
    &self,
    f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
  ) -> Result<T, StoreError> {
    let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
    f(&mut conn)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    let db = Database::open(&path).unwrap();
    let tables: i64 = db
      .with_conn(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
          [],
          |row| row.get(0),
        )?)
      })
      .unwrap();

    assert!(path.exists());
    assert_eq!(tables, 2);
  }

  #[test]
  fn test_migrations_are_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    drop(Database::open(&path).unwrap());
    assert!(Database::open(&path).is_ok());
  }
}
