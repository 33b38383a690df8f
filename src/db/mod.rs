// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Database module for persistent storage
//!
//! Readings are appended to a single `sensor_readings` table and never
//! updated. Every write is committed before the call returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::sensors::{parse_timestamp, Reading, ReadingSource, TIMESTAMP_FORMAT};

/// Failures of the durable reading log
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create data directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open database {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema setup failed: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("insert failed: {0}")]
    Insert(#[source] rusqlite::Error),

    #[error("refusing to store non-finite {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("row {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of readings, queryable by recency.
pub trait ReadingStore: Send + Sync {
    /// Create the readings table if it does not exist. Safe to call repeatedly.
    fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Persist one reading and return it with its assigned id.
    ///
    /// Non-finite measurements (NaN, infinity) are rejected with
    /// [`StorageError::NonFinite`] and nothing is written.
    fn insert(&self, reading: &Reading) -> Result<Reading, StorageError>;

    /// Up to `limit` readings, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError>;

    /// Total number of stored readings
    fn count(&self) -> Result<u64, StorageError>;
}

const CREATE_READINGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sensor_readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        plot_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        humidity REAL NOT NULL,
        ph REAL NOT NULL,
        nutrients REAL NOT NULL,
        source TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sensor_readings_plot ON sensor_readings(plot_id);
"#;

/// SQLite-backed reading store
pub struct SqliteReadingStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteReadingStore {
    /// Open or create the database file and make sure the schema exists
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&config.path).map_err(|source| StorageError::Open {
            path: config.path.clone(),
            source,
        })?;

        // FULL sync: a returned insert survives a crash.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
        "#,
        )
        .map_err(StorageError::Schema)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(StorageError::Schema)?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(config.path.clone()),
        };
        store.ensure_schema()?;

        info!("Database opened at {:?}", config.path);
        Ok(store)
    }

    /// Private in-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl ReadingStore for SqliteReadingStore {
    fn ensure_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute_batch(CREATE_READINGS_TABLE)
            .map_err(StorageError::Schema)
    }

    fn insert(&self, reading: &Reading) -> Result<Reading, StorageError> {
        // SQLite binds NaN as NULL
        for (field, value) in [
            ("humidity", reading.humidity),
            ("ph", reading.ph),
            ("nutrients", reading.nutrients),
        ] {
            if !value.is_finite() {
                return Err(StorageError::NonFinite { field, value });
            }
        }

        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO sensor_readings (plot_id, timestamp, humidity, ph, nutrients, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reading.plot_id,
                reading.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                reading.humidity,
                reading.ph,
                reading.nutrients,
                reading.source.as_str(),
            ],
        )
        .map_err(StorageError::Insert)?;

        let id = conn.last_insert_rowid();
        debug!("Stored reading {} for plot {}", id, reading.plot_id);

        Ok(reading.clone().with_id(id))
    }

    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, plot_id, timestamp, humidity, ph, nutrients, source
                 FROM sensor_readings
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(StorageError::Query)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    plot_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    humidity: row.get(3)?,
                    ph: row.get(4)?,
                    nutrients: row.get(5)?,
                    source: row.get(6)?,
                })
            })
            .map_err(StorageError::Query)?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row.map_err(StorageError::Query)?.into_reading()?);
        }

        Ok(readings)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sensor_readings", [], |row| row.get(0))
            .map_err(StorageError::Query)?;

        Ok(count.max(0) as u64)
    }
}

/// Raw column values before decoding
struct StoredRow {
    id: i64,
    plot_id: u32,
    timestamp: String,
    humidity: f64,
    ph: f64,
    nutrients: f64,
    source: String,
}

impl StoredRow {
    fn into_reading(self) -> Result<Reading, StorageError> {
        let id = self.id;
        let corrupt = |reason: String| StorageError::Corrupt { id, reason };

        let timestamp = parse_timestamp(&self.timestamp)
            .map_err(|e| corrupt(format!("invalid timestamp '{}': {}", self.timestamp, e)))?;
        let source = self
            .source
            .parse::<ReadingSource>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Reading {
            id: Some(id),
            plot_id: self.plot_id,
            timestamp,
            humidity: self.humidity,
            ph: self.ph,
            nutrients: self.nutrients,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(plot_id: u32, humidity: f64) -> Reading {
        Reading::new(plot_id, humidity, 6.0, 50.0, ReadingSource::Simulated)
    }

    #[test]
    fn test_insert_then_recent_returns_it() {
        let store = SqliteReadingStore::open_in_memory().unwrap();

        let stored = store.insert(&reading(1, 42.5)).unwrap();
        assert!(stored.id.is_some());

        let recent = store.recent(1).unwrap();
        assert_eq!(recent, vec![stored]);
    }

    #[test]
    fn test_recent_zero_is_empty() {
        let store = SqliteReadingStore::open_in_memory().unwrap();
        store.insert(&reading(1, 20.0)).unwrap();
        store.insert(&reading(2, 60.0)).unwrap();

        assert!(store.recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = SqliteReadingStore::open_in_memory().unwrap();

        let a = store.insert(&reading(1, 11.0)).unwrap();
        let b = store.insert(&reading(1, 22.0)).unwrap();
        let c = store.insert(&reading(1, 33.0)).unwrap();

        assert!(a.id < b.id && b.id < c.id);
        assert_eq!(store.recent(3).unwrap(), vec![c.clone(), b.clone(), a]);
        assert_eq!(store.recent(2).unwrap(), vec![c, b]);
    }

    #[test]
    fn test_recent_limit_larger_than_table() {
        let store = SqliteReadingStore::open_in_memory().unwrap();
        store.insert(&reading(5, 70.0)).unwrap();

        assert_eq!(store.recent(100).unwrap().len(), 1);
        assert_eq!(store.recent(usize::MAX).unwrap().len(), 1);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = SqliteReadingStore::open_in_memory().unwrap();
        store.insert(&reading(1, 25.0)).unwrap();
        store.insert(&reading(2, 35.0)).unwrap();
        let before = store.recent(10).unwrap();

        for _ in 0..3 {
            store.ensure_schema().unwrap();
        }

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.recent(10).unwrap(), before);
    }

    #[test]
    fn test_timestamp_persisted_as_text() {
        let store = SqliteReadingStore::open_in_memory().unwrap();
        let stored = store.insert(&reading(3, 44.4)).unwrap();

        let conn = store.conn.lock();
        let (text, source): (String, String) = conn
            .query_row(
                "SELECT timestamp, source FROM sensor_readings WHERE id = ?1",
                params![stored.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();

        assert_eq!(text, stored.formatted_timestamp());
        assert_eq!(source, "simulated");
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let store = SqliteReadingStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO sensor_readings (plot_id, timestamp, humidity, ph, nutrients, source)
                 VALUES (1, 'yesterday', 30.0, 6.0, 50.0, 'simulated')",
                [],
            )
            .unwrap();

        assert!(matches!(store.recent(1), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let store = SqliteReadingStore::open_in_memory().unwrap();

        let err = store.insert(&reading(1, f64::NAN)).unwrap_err();
        assert!(matches!(err, StorageError::NonFinite { field: "humidity", .. }));
        assert!(err.to_string().contains("humidity"));

        let mut bad_ph = reading(1, 40.0);
        bad_ph.ph = f64::INFINITY;
        assert!(matches!(
            store.insert(&bad_ph),
            Err(StorageError::NonFinite { field: "ph", .. })
        ));

        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("farmtech.db"),
            ..DatabaseConfig::default()
        };

        let stored = {
            let store = SqliteReadingStore::open(&config).unwrap();
            assert_eq!(store.path(), Some(config.path.as_path()));
            store.insert(&reading(9, 12.3)).unwrap()
        };

        let reopened = SqliteReadingStore::open(&config).unwrap();
        assert_eq!(reopened.recent(1).unwrap(), vec![stored]);
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
