//! SQLite-backed progress store for offline use.
//!
//! The record lives as one JSON document in a `kv` table, so a partial
//! update is a read-modify-write inside a single transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, ProgressStore};
use crate::error::PersistenceError;
use crate::progress::{ProgressRecord, ProgressUpdate};

const PROGRESS_KEY: &str = "breathing_progress";

pub struct SqliteProgressStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProgressStore {
    /// Open the database at `~/.config/breathwork/breathwork.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Self::open_at(dir.join("breathwork.db"))
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Load the stored record.
    pub fn load(&self) -> Result<Option<ProgressRecord>, PersistenceError> {
        read_record(&lock(&self.conn))
    }

    /// Apply a partial update and return the resulting record.
    pub fn apply(&self, update: &ProgressUpdate) -> Result<ProgressRecord, PersistenceError> {
        apply_update(&self.conn, update)
    }

    /// Delete the stored record.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        lock(&self.conn).execute("DELETE FROM kv WHERE key = ?1", params![PROGRESS_KEY])?;
        Ok(())
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply_update(
    conn: &Mutex<Connection>,
    update: &ProgressUpdate,
) -> Result<ProgressRecord, PersistenceError> {
    let mut conn = lock(conn);
    let tx = conn.transaction()?;
    let mut record = read_record(&tx)?.unwrap_or_default();
    update.apply_to(&mut record);
    tx.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![PROGRESS_KEY, serde_json::to_string(&record)?],
    )?;
    tx.commit()?;
    Ok(record)
}

fn read_record(conn: &Connection) -> Result<Option<ProgressRecord>, PersistenceError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![PROGRESS_KEY],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn get_progress(&self) -> Result<Option<ProgressRecord>, PersistenceError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || read_record(&lock(&conn)))
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?
    }

    async fn update_progress(&self, update: ProgressUpdate) -> Result<(), PersistenceError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || apply_update(&conn, &update).map(|_| ()))
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database_has_no_record() {
        let store = SqliteProgressStore::open_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn updates_merge_into_stored_record() {
        let store = SqliteProgressStore::open_memory().unwrap();
        store
            .apply(&ProgressUpdate {
                streak: Some(3),
                total_sessions: Some(7),
                ..Default::default()
            })
            .unwrap();
        let record = store
            .apply(&ProgressUpdate {
                last_session_elapsed_time: Some(40),
                last_selected_technique: Some("478".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(record.streak, 3);
        assert_eq!(record.total_sessions, 7);
        assert_eq!(record.last_session_elapsed_time, 40);
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn clear_removes_record() {
        let store = SqliteProgressStore::open_memory().unwrap();
        store.apply(&ProgressUpdate::default()).unwrap();
        assert!(store.load().unwrap().is_some());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupted_row_is_reported() {
        let store = SqliteProgressStore::open_memory().unwrap();
        lock(&store.conn)
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, 'not json')",
                params![PROGRESS_KEY],
            )
            .unwrap();
        assert!(matches!(store.load(), Err(PersistenceError::Malformed(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn blocked_database_does_not_stall_the_runtime() {
        let store = Arc::new(SqliteProgressStore::open_memory().unwrap());
        let guard = lock(&store.conn);

        let pending = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_progress().await }
        });
        // Other tasks still run while the read waits on the connection.
        let other = tokio::spawn(async { 7 });
        assert_eq!(other.await.unwrap(), 7);

        drop(guard);
        assert!(pending.await.unwrap().unwrap().is_none());

        store
            .update_progress(ProgressUpdate {
                streak: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap().streak, 2);
    }
}
