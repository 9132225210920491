//! Durable storage for store snapshots.
//!
//! # Responsibility
//! - Save and load one serialized `StoreState` under a fixed key.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - One record per key; saving replaces the previous snapshot.
//! - A saved snapshot loads back with an identical `tasks` sequence.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::store::state::StoreState;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Storage key of the task store snapshot.
pub const TASK_STORAGE_KEY: &str = "task-storage";

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Load/save contract for store snapshots.
pub trait StatePersistence: Send + Sync {
    fn load(&self) -> PersistResult<Option<StoreState>>;
    fn save(&self, state: &StoreState) -> PersistResult<()>;
}

/// SQLite-backed snapshot storage using the `kv_store` table.
pub struct SqliteStatePersistence {
    conn: Mutex<Connection>,
    key: String,
}

impl SqliteStatePersistence {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn in_memory() -> PersistResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            key: TASK_STORAGE_KEY.to_string(),
        }
    }

    /// Stores snapshots under `key` instead of the default task key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Deletes the stored snapshot, if any.
    pub fn clear(&self) -> PersistResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM kv_store WHERE key = ?1;", [self.key.as_str()])?;
        Ok(())
    }
}

impl StatePersistence for SqliteStatePersistence {
    fn load(&self) -> PersistResult<Option<StoreState>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &StoreState) -> PersistResult<()> {
        let payload = serde_json::to_string(state)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key.as_str(), payload],
        )?;
        debug!(
            "event=state_persist module=store status=ok key={} tasks={}",
            self.key,
            state.tasks.len()
        );
        Ok(())
    }
}
