//! Storage layer for carelog.
//!
//! This module provides `SQLite`-based persistent storage for the event log,
//! the resident directory, structured daily logs and the key-value table.
//! The event log is append-only; per-resident, per-category-per-day and
//! facility-wide views are queries over it.

pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::daily_log::DailyLog;
use crate::error::{Error, Result};
use crate::kv::KeyValueStore;
use crate::record::{format_timestamp, EventRecord, RecordId};
use crate::resident::{Resident, ResidentId};

/// Key holding the RFC 3339 time of the last successful save.
pub const SAVED_AT_KEY: &str = "daily_logs_saved_at";

/// Storage engine for carelog.
///
/// Wraps a single connection behind a mutex so one instance can be shared
/// through an `Arc` between the recorder and the directory.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets a second process read while this one appends
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::initialize(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("storage connection lock poisoned"))
    }

    // === Event log ===

    /// Append a record to the event log.
    ///
    /// Returns the record's position in the log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] if a record with the same id exists,
    /// or an error if the database operation fails.
    pub fn append_event(&self, record: &EventRecord) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let seq = Self::insert_event(&tx, record)?;
        tx.commit()?;
        Ok(seq)
    }

    /// Append several records in one transaction.
    ///
    /// Nothing is stored if any record fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] if an id is already taken, or an
    /// error if the database operation fails.
    pub fn append_events(&self, records: &[EventRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for record in records {
            Self::insert_event(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Append a new submission and store the last-saved time in one transaction.
    ///
    /// Either both writes land or neither does. If another writer already
    /// took the record's id, the record is given the next free id instead,
    /// so submissions made in the same millisecond are all kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_event_with_saved_at(
        &self,
        record: &mut EventRecord,
        saved_at: &DateTime<Utc>,
    ) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::claim_id(&tx, record)?;
        let seq = Self::insert_event(&tx, record)?;
        Self::put_kv(&tx, SAVED_AT_KEY, &format_timestamp(saved_at))?;
        tx.commit()?;
        Ok(seq)
    }

    /// Move `record` past the largest stored id when its id is taken.
    fn claim_id(tx: &Transaction<'_>, record: &mut EventRecord) -> Result<()> {
        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM events WHERE id = ?1",
            [record.id.as_str()],
            |row| row.get(0),
        )?;
        if taken == 0 {
            return Ok(());
        }

        let max: i64 = tx.query_row(
            "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) FROM events",
            [],
            |row| row.get(0),
        )?;
        let current = record.id.as_str().parse::<i64>().unwrap_or(0);
        let next = RecordId::new((max.max(current) + 1).to_string());
        debug!("Record id {} is taken, using {}", record.id, next);
        record.id = next;
        Ok(())
    }

    fn insert_event(tx: &Transaction<'_>, record: &EventRecord) -> Result<i64> {
        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM events WHERE id = ?1",
            [record.id.as_str()],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::DuplicateRecord {
                id: record.id.to_string(),
            });
        }

        let body = serde_json::to_string(record)?;
        let hash = record.content_hash()?;
        tx.execute(
            r"
            INSERT INTO events (id, user_id, event_type, record_date, timestamp, body, content_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                record.id.as_str(),
                record.user_id.as_str(),
                record.category().id(),
                record.local_date().to_string(),
                format_timestamp(&record.timestamp),
                body,
                hash,
            ],
        )?;

        let seq = tx.last_insert_rowid();
        debug!("Appended record {} at seq {}", record.id, seq);
        Ok(seq)
    }

    /// Records about one resident, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn events_for_resident(&self, user_id: &ResidentId) -> Result<Vec<EventRecord>> {
        self.query_events(
            "SELECT seq, body FROM events WHERE user_id = ?1 ORDER BY seq",
            params![user_id.as_str()],
        )
    }

    /// Records of one category on one local date, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn events_for_category_on(
        &self,
        category: Category,
        date: NaiveDate,
    ) -> Result<Vec<EventRecord>> {
        self.query_events(
            "SELECT seq, body FROM events WHERE event_type = ?1 AND record_date = ?2 ORDER BY seq",
            params![category.id(), date.to_string()],
        )
    }

    /// Every record in the log, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_events(&self) -> Result<Vec<EventRecord>> {
        self.query_events("SELECT seq, body FROM events ORDER BY seq", params![])
    }

    /// Rows whose body no longer decodes are skipped with a warning.
    fn query_events(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<EventRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let records = rows
            .into_iter()
            .filter_map(|(seq, body)| match serde_json::from_str(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable record at seq {}: {}", seq, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// Count records in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether a record with this id is in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn contains_id(&self, id: &RecordId) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM events WHERE id = ?1",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether a record with this content hash is in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn contains_hash(&self, hash: &str) -> Result<bool> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM events WHERE content_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // === Residents ===

    /// Residents in the order they were first stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_residents(&self) -> Result<Vec<Resident>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, body FROM residents ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let residents = rows
            .into_iter()
            .filter_map(|(id, body)| match serde_json::from_str(&body) {
                Ok(resident) => Some(resident),
                Err(e) => {
                    warn!("Skipping unreadable resident {}: {}", id, e);
                    None
                }
            })
            .collect();
        Ok(residents)
    }

    /// Get a resident by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored row is corrupt.
    pub fn get_resident(&self, id: &ResidentId) -> Result<Option<Resident>> {
        let body: Option<String> = self
            .lock()?
            .query_row(
                "SELECT body FROM residents WHERE id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Insert a resident, or replace the stored one with the same id.
    ///
    /// A replaced resident keeps its position in the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_resident(&self, resident: &Resident) -> Result<()> {
        let body = serde_json::to_string(resident)?;
        self.lock()?.execute(
            r"
            INSERT INTO residents (id, name, body) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, body = excluded.body
            ",
            params![resident.id.as_str(), resident.name, body],
        )?;
        Ok(())
    }

    // === Daily logs ===

    /// Store a daily log and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_daily_log(&self, log: &DailyLog) -> Result<DailyLog> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO daily_logs (user_id, record_date, body) VALUES (?1, ?2, '{}')",
            params![log.user_id.as_str(), log.record_date.to_string()],
        )?;
        let rowid = tx.last_insert_rowid();

        let mut stored = log.clone();
        stored.id = Some(rowid.to_string());
        tx.execute(
            "UPDATE daily_logs SET body = ?1 WHERE id = ?2",
            params![serde_json::to_string(&stored)?, rowid],
        )?;
        tx.commit()?;

        debug!("Stored daily log {} for {}", rowid, log.user_id);
        Ok(stored)
    }

    /// Daily logs of one resident, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn daily_logs_for(&self, user_id: &ResidentId) -> Result<Vec<DailyLog>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, body FROM daily_logs WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([user_id.as_str()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let logs = rows
            .into_iter()
            .filter_map(|(id, body)| match serde_json::from_str(&body) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("Skipping unreadable daily log {}: {}", id, e);
                    None
                }
            })
            .collect();
        Ok(logs)
    }

    // === Key-value ===

    fn put_kv(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            r"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        Ok(())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.lock()?;
        let total_events: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        let residents: i64 =
            conn.query_row("SELECT COUNT(*) FROM residents", [], |row| row.get(0))?;
        let daily_logs: i64 =
            conn.query_row("SELECT COUNT(*) FROM daily_logs", [], |row| row.get(0))?;

        let oldest: Option<String> = conn
            .query_row(
                "SELECT timestamp FROM events ORDER BY timestamp ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let newest: Option<String> = conn
            .query_row(
                "SELECT timestamp FROM events ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_saved: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [SAVED_AT_KEY], |row| {
                row.get(0)
            })
            .optional()?;
        drop(conn);

        let parse = |s: String| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_events,
            residents,
            daily_logs,
            oldest_event: oldest.and_then(parse),
            newest_event: newest.and_then(parse),
            last_saved_at: last_saved.and_then(parse),
            db_size_bytes,
        })
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .lock()?
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        Self::put_kv(&conn, key, value)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of records in the event log.
    pub total_events: i64,
    /// Number of residents in the directory table.
    pub residents: i64,
    /// Number of stored daily logs.
    pub daily_logs: i64,
    /// Timestamp of the oldest record.
    pub oldest_event: Option<DateTime<Utc>>,
    /// Timestamp of the newest record.
    pub newest_event: Option<DateTime<Utc>>,
    /// Time of the last successful save.
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
