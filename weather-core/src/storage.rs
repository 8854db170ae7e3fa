//! Append-only SQLite storage for daily summaries.
//!
//! Rows are never updated or deleted. Several rows may exist for the same
//! city and date.

use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, error};

use crate::{error::PersistenceError, model::DailySummary};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Durable log of daily summaries.
pub trait SummaryStore: Send + Sync {
    /// Ensure the schema exists. Safe to call more than once.
    fn init(&self) -> Result<(), PersistenceError>;

    /// Insert a new row.
    fn append(&self, summary: &DailySummary) -> Result<(), PersistenceError>;

    /// All rows for exactly this city and date, in insertion order.
    fn query(&self, city: &str, date: NaiveDate) -> Result<Vec<DailySummary>, PersistenceError>;
}

pub struct SqliteSummaryStore {
    conn: Mutex<Connection>,
}

impl SqliteSummaryStore {
    /// Open or create the database file at `path`.
    ///
    /// The schema is not created until [`SummaryStore::init`] is called.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| PersistenceError::Open(format!("{}: {e}", path.display())))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn =
            Connection::open_in_memory().map_err(|e| PersistenceError::Open(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<DailySummary> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(DailySummary {
            city: row.get(0)?,
            date,
            avg_temp: row.get(2)?,
            max_temp: row.get(3)?,
            min_temp: row.get(4)?,
            dominant_condition: row.get(5)?,
        })
    }
}

impl SummaryStore for SqliteSummaryStore {
    fn init(&self) -> Result<(), PersistenceError> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS daily_summaries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    city TEXT NOT NULL,
                    date TEXT NOT NULL,
                    avg_temp REAL NOT NULL,
                    max_temp REAL NOT NULL,
                    min_temp REAL NOT NULL,
                    dominant_condition TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_daily_summaries_city_date
                    ON daily_summaries(city, date);
                "#,
            )
            .map_err(|e| {
                error!(error = %e, "failed to initialise summary schema");
                PersistenceError::Open(e.to_string())
            })
    }

    fn append(&self, summary: &DailySummary) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO daily_summaries
                (city, date, avg_temp, max_temp, min_temp, dominant_condition)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                summary.city,
                summary.date.format(DATE_FORMAT).to_string(),
                summary.avg_temp,
                summary.max_temp,
                summary.min_temp,
                summary.dominant_condition,
            ],
        )
        .map_err(|e| {
            error!(city = %summary.city, error = %e, "failed to insert daily summary");
            PersistenceError::Write(e.to_string())
        })?;

        debug!(city = %summary.city, id = conn.last_insert_rowid(), "daily summary stored");
        Ok(())
    }

    fn query(&self, city: &str, date: NaiveDate) -> Result<Vec<DailySummary>, PersistenceError> {
        let read_err = |e: rusqlite::Error| {
            error!(city, %date, error = %e, "failed to query daily summaries");
            PersistenceError::Read(e.to_string())
        };

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT city, date, avg_temp, max_temp, min_temp, dominant_condition
                 FROM daily_summaries
                 WHERE city = ?1 AND date = ?2
                 ORDER BY id",
            )
            .map_err(read_err)?;

        let rows = stmt
            .query_map(params![city, date.format(DATE_FORMAT).to_string()], Self::row_to_summary)
            .map_err(read_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(read_err)
    }
}
