//! SQLite-backed key-value storage.
//!
//! Provides persistent storage for:
//! - The counter state, one row per field
//! - The scheduled job book (JSON)
//!
//! `update` runs inside a `BEGIN IMMEDIATE` transaction, so two processes
//! doing a check-in at the same time are serialized by SQLite's write lock.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{data_dir, StateStore};
use crate::error::{DatabaseError, Result};
use crate::state::{CounterState, STATE_KEYS};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database holding the key-value table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data dir>/cycletrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("cycletrack.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(DatabaseError::from)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = kv_get(&self.conn(), key).map_err(DatabaseError::from)?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        kv_set(&self.conn(), key, Some(value)).map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Remove a key from the kv store.
    pub fn kv_remove(&self, key: &str) -> Result<()> {
        kv_set(&self.conn(), key, None).map_err(DatabaseError::from)?;
        Ok(())
    }
}

fn kv_get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
}

fn kv_set(conn: &Connection, key: &str, value: Option<&str>) -> rusqlite::Result<()> {
    match value {
        Some(value) => conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?,
        None => conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?,
    };
    Ok(())
}

/// Read the state inside an open connection or transaction.
fn read_state(conn: &Connection) -> rusqlite::Result<CounterState> {
    let mut values = Vec::with_capacity(STATE_KEYS.len());
    for key in STATE_KEYS {
        values.push((key, kv_get(conn, key)?));
    }
    Ok(CounterState::from_lookup(|key| {
        values
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.clone())
    }))
}

fn write_state(conn: &Connection, state: &CounterState) -> rusqlite::Result<()> {
    for (key, value) in state.to_entries() {
        kv_set(conn, key, value.as_deref())?;
    }
    Ok(())
}

impl StateStore for Database {
    fn load(&self) -> Result<CounterState> {
        let state = read_state(&self.conn()).map_err(DatabaseError::from)?;
        Ok(state)
    }

    fn save(&self, state: &CounterState) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        write_state(&tx, state).map_err(DatabaseError::from)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    fn update(
        &self,
        f: &mut dyn FnMut(CounterState) -> CounterState,
    ) -> Result<CounterState> {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let next = f(read_state(&tx).map_err(DatabaseError::from)?);
        write_state(&tx, &next).map_err(DatabaseError::from)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(next)
    }
}
