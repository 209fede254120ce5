//! SQLite-backed prayer-time store.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, Stream};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::clock::Clock;
use crate::db::{Database, StoreError};
use crate::prayer::{CalculationMethod, PrayerDayRecord};

/// Buffered change notifications per subscriber before it starts lagging
const CHANGE_CHANNEL_CAPACITY: usize = 64;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str =
  "SELECT date, fajr, sunrise, dhuhr, asr, maghrib, isha, calculation_method, last_updated
   FROM prayer_times";

/// A committed write to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
  /// Records for these dates were inserted or replaced
  Upserted { dates: Vec<NaiveDate> },
  /// Every record was removed
  Cleared,
}

/// Persistent cache of daily records, keyed by calendar date.
///
/// Each write runs in a single transaction, so a concurrent reader sees
/// either the previous or the new window, never a mix.
pub struct PrayerTimeStore {
  db: Arc<Database>,
  clock: Arc<dyn Clock>,
  changes: broadcast::Sender<StoreChange>,
}

impl PrayerTimeStore {
  pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
    let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
    Self { db, clock, changes }
  }

  /// Insert or replace every record by date. Other dates are left untouched.
  pub fn upsert_window(&self, records: &[PrayerDayRecord]) -> Result<usize, StoreError> {
    if records.is_empty() {
      return Ok(0);
    }

    self.db.with_conn(|conn| {
      let tx = conn.transaction()?;
      {
        let mut stmt = tx.prepare_cached(
          "INSERT OR REPLACE INTO prayer_times
             (date, fajr, sunrise, dhuhr, asr, maghrib, isha, calculation_method, last_updated)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for record in records {
          stmt.execute(params![
            format_date(record.date),
            record.fajr,
            record.sunrise,
            record.dhuhr,
            record.asr,
            record.maghrib,
            record.isha,
            record.method.id(),
            record.last_updated.timestamp_millis(),
          ])?;
        }
      }
      tx.commit()?;

      // Published under the connection lock so subscribers see commit order
      let _ = self.changes.send(StoreChange::Upserted {
        dates: records.iter().map(|r| r.date).collect(),
      });

      debug!(count = records.len(), "Upserted prayer times");
      Ok(records.len())
    })
  }

  pub fn get_for_date(&self, date: NaiveDate) -> Result<Option<PrayerDayRecord>, StoreError> {
    let raw = self.db.with_conn(|conn| {
      let sql = format!("{} WHERE date = ?1 LIMIT 1", SELECT_COLUMNS);
      Ok(
        conn
          .query_row(&sql, params![format_date(date)], RawRecord::from_row)
          .optional()?,
      )
    })?;

    raw.map(RawRecord::into_record).transpose()
  }

  /// Clock deciding "today" for this store
  pub fn clock(&self) -> Arc<dyn Clock> {
    Arc::clone(&self.clock)
  }

  /// Current calendar date in the caller's zone
  pub fn today(&self) -> NaiveDate {
    self.clock.today()
  }

  pub fn get_today(&self) -> Result<Option<PrayerDayRecord>, StoreError> {
    self.get_for_date(self.today())
  }

  /// Every record in ascending date order
  pub fn get_all(&self) -> Result<Vec<PrayerDayRecord>, StoreError> {
    let raw = self.db.with_conn(|conn| {
      let sql = format!("{} ORDER BY date ASC", SELECT_COLUMNS);
      let mut stmt = conn.prepare(&sql)?;
      let rows = stmt
        .query_map([], RawRecord::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
      Ok(rows)
    })?;

    raw.into_iter().map(RawRecord::into_record).collect()
  }

  /// Remove every record. Only used for full resets.
  pub fn clear_all(&self) -> Result<(), StoreError> {
    self.db.with_conn(|conn| {
      let removed = conn.execute("DELETE FROM prayer_times", [])?;
      let _ = self.changes.send(StoreChange::Cleared);
      debug!(removed, "Cleared prayer times");
      Ok(())
    })
  }

  pub fn oldest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
    self.date_aggregate("MIN")
  }

  pub fn newest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
    self.date_aggregate("MAX")
  }

  pub fn count(&self) -> Result<usize, StoreError> {
    let count: i64 = self.db.with_conn(|conn| {
      Ok(conn.query_row("SELECT COUNT(*) FROM prayer_times", [], |row| row.get(0))?)
    })?;

    usize::try_from(count).map_err(|_| StoreError::Corrupt {
      column: "count",
      value: count.to_string(),
    })
  }

  fn date_aggregate(&self, function: &str) -> Result<Option<NaiveDate>, StoreError> {
    let sql = format!("SELECT {}(date) FROM prayer_times", function);
    let value: Option<String> = self
      .db
      .with_conn(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))?;

    value.as_deref().map(parse_date).transpose()
  }

  /// Change notifications, delivered in commit order.
  pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
    self.changes.subscribe()
  }

  /// Live view of `get_all`: yields the current records immediately, then
  /// again after every committed change.
  pub fn watch_all(
    self: &Arc<Self>,
  ) -> impl Stream<Item = Result<Vec<PrayerDayRecord>, StoreError>> + Send + 'static {
    // Subscribe before the first read so no commit falls in between
    let receiver = self.subscribe();
    let store = Arc::clone(self);

    stream::unfold(
      (store, receiver, true),
      |(store, mut receiver, first)| async move {
        if !first {
          match receiver.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return None,
          }
        }
        let snapshot = store.get_all();
        Some((snapshot, (store, receiver, false)))
      },
    )
  }
}

/// Row as stored, before parsing
struct RawRecord {
  date: String,
  fajr: String,
  sunrise: String,
  dhuhr: String,
  asr: String,
  maghrib: String,
  isha: String,
  method: String,
  last_updated: i64,
}

impl RawRecord {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      date: row.get(0)?,
      fajr: row.get(1)?,
      sunrise: row.get(2)?,
      dhuhr: row.get(3)?,
      asr: row.get(4)?,
      maghrib: row.get(5)?,
      isha: row.get(6)?,
      method: row.get(7)?,
      last_updated: row.get(8)?,
    })
  }

  fn into_record(self) -> Result<PrayerDayRecord, StoreError> {
    let method = self
      .method
      .parse::<CalculationMethod>()
      .map_err(|_| StoreError::Corrupt {
        column: "calculation_method",
        value: self.method.clone(),
      })?;
    let last_updated =
      DateTime::<Utc>::from_timestamp_millis(self.last_updated).ok_or(StoreError::Corrupt {
        column: "last_updated",
        value: self.last_updated.to_string(),
      })?;

    Ok(PrayerDayRecord {
      date: parse_date(&self.date)?,
      fajr: self.fajr,
      sunrise: self.sunrise,
      dhuhr: self.dhuhr,
      asr: self.asr,
      maghrib: self.maghrib,
      isha: self.isha,
      method,
      last_updated,
    })
  }
}

fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| StoreError::Corrupt {
    column: "date",
    value: s.to_string(),
  })
}
