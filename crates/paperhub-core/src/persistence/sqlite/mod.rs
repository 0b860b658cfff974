//! SQLite-backed paper store.
//!
//! One store wraps one connection; operations on the same store are
//! serialized by the connection mutex. The operation bodies live in
//! `mutations`, `queries` and `stats`.

mod mutations;
mod queries;
mod stats;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params, TransactionBehavior};

use super::schema::{Schema, SCHEMA_VERSION};
use crate::config::StoreConfig;
use crate::error::{ConfigError, StoreError};
use crate::model::PaperRecord;

/// Columns of a [`PaperRecord`], for queries aliasing `papers` as `p`.
const RECORD_COLUMNS: &str = "p.pid, p.username, p.title, p.created, p.description";

/// Paper store on top of a single SQLite connection.
pub struct SqlitePaperStore {
    conn: Mutex<Connection>,
}

impl SqlitePaperStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(&StoreConfig::with_path(path.as_ref()))
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open_with_config(&StoreConfig::default())
    }

    /// Open the database described by `config`.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self, StoreError> {
        config
            .validate()
            .map_err(|e: ConfigError| StoreError::Storage(format!("invalid config: {}", e)))?;

        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        if config.path.is_some() {
            let mode: String = conn.pragma_update_and_check(
                None,
                "journal_mode",
                config.journal_mode.as_sql(),
                |row| row.get(0),
            )?;
            tracing::debug!("SQLite journal mode set to {}", mode);
        }
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        Self::from_connection(conn)
    }

    /// Take over a caller-supplied connection, creating the schema if needed.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        let has_version_table: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|c| c > 0)?;

        let current_version: Option<u32> = if has_version_table {
            conn.query_row(
                "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
        } else {
            None
        };

        match current_version {
            Some(SCHEMA_VERSION) => {}
            Some(other) => {
                return Err(StoreError::Storage(format!(
                    "unsupported schema version {} (expected {})",
                    other, SCHEMA_VERSION
                )));
            }
            None => {
                tracing::info!("Creating paperhub schema version {}", SCHEMA_VERSION);
                Self::create_schema(conn)?;
            }
        }
        Ok(())
    }

    fn create_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(Schema::create_tables())?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Drop every table and recreate an empty schema.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(Schema::drop_tables())?;
        Self::create_schema(&tx)?;
        tx.commit()?;
        tracing::info!("Database reset");
        Ok(())
    }

    /// The database's current time in UTC.
    pub fn current_time(&self) -> Result<DateTime<Utc>, StoreError> {
        let conn = self.lock()?;
        let millis: i64 = conn.query_row(
            "SELECT CAST((julianday('now') - 2440587.5) * 86400000.0 AS INTEGER)",
            [],
            |row| row.get(0),
        )?;
        millis_to_utc(millis).ok_or_else(|| {
            StoreError::Storage(format!("clock value out of range: {}", millis))
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

/// Server-assigned timestamp for new rows.
fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// `LIMIT` operand for a caller-supplied count.
fn limit(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaperRecord> {
    let created_ms: i64 = row.get(3)?;
    let created = millis_to_utc(created_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, created_ms))?;
    Ok(PaperRecord {
        pid: row.get(0)?,
        username: row.get(1)?,
        title: row.get(2)?,
        created,
        description: row.get(4)?,
    })
}

/// Run a query selecting [`RECORD_COLUMNS`] and collect the records in order.
fn query_records<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<PaperRecord>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let records = stmt
        .query_map(params, row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Run a single-value `COUNT` query.
fn query_count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<u64, StoreError> {
    let count: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::store::{Mutations, PaperQueries, Statistics};

    #[test]
    fn open_in_memory_creates_schema() {
        let store = SqlitePaperStore::open_in_memory().unwrap();
        assert_eq!(row_count(&store, "users"), 0);
        assert_eq!(row_count(&store, "schema_version"), 1);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let store = SqlitePaperStore::open_in_memory().unwrap();
        // Owner does not exist
        assert!(store
            .add_new_paper("ghost", "t", "d", "x", &["tag1"])
            .is_err());
        assert_eq!(row_count(&store, "papers"), 0);
    }

    #[test]
    fn reset_empties_everything() {
        let store = store_with_users(&["alice", "bob"]);
        let pid = paper_at(&store, "alice", 1, &["tag1"]);
        store.like_paper("bob", pid).unwrap();

        store.reset().unwrap();

        for table in ["users", "papers", "tags", "tagnames", "likes", "papers_fts"] {
            assert_eq!(row_count(&store, table), 0, "{} not empty", table);
        }
        assert_eq!(row_count(&store, "schema_version"), 1);
        assert!(store.get_timeline_all(10).unwrap().is_empty());

        // Usable again after reset
        store.signup("alice", "pw").unwrap();
        assert_eq!(store.get_number_papers_user("alice").unwrap(), 0);
    }

    #[test]
    fn current_time_is_close_to_now() {
        let store = SqlitePaperStore::open_in_memory().unwrap();
        let db_now = store.current_time().unwrap();
        let drift = (Utc::now() - db_now).num_seconds().abs();
        assert!(drift < 5, "clock drift {}s", drift);
    }

    #[test]
    fn created_timestamps_are_utc_millis() {
        let store = store_with_users(&["alice"]);
        let before = Utc::now().timestamp_millis();
        let pid = store.add_new_paper("alice", "t", "d", "x", &[]).unwrap();
        let after = Utc::now().timestamp_millis();

        let records = store.get_timeline("alice", 1).unwrap();
        assert_eq!(records[0].pid, pid);
        let created = records[0].created.timestamp_millis();
        assert!(before <= created && created <= after);
    }

    #[test]
    fn limit_saturates() {
        assert_eq!(limit(0), 0);
        assert_eq!(limit(10), 10);
        assert_eq!(limit(usize::MAX), i64::MAX);
    }
}
