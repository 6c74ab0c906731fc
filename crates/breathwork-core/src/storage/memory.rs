//! In-process store for tests and embedders without a backend.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::ProgressStore;
use crate::error::PersistenceError;
use crate::progress::{ProgressRecord, ProgressUpdate};

#[derive(Debug, Default)]
struct Inner {
    record: Option<ProgressRecord>,
    writes: Vec<ProgressUpdate>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Cloning shares the underlying record.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: ProgressRecord) -> Self {
        let store = Self::new();
        store.lock().record = Some(record);
        store
    }

    /// Current stored record, if any.
    pub fn record(&self) -> Option<ProgressRecord> {
        self.lock().record.clone()
    }

    /// Every update received, in arrival order.
    pub fn writes(&self) -> Vec<ProgressUpdate> {
        self.lock().writes.clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get_progress(&self) -> Result<Option<ProgressRecord>, PersistenceError> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(PersistenceError::Unavailable("memory store read disabled".into()));
        }
        Ok(inner.record.clone())
    }

    async fn update_progress(&self, update: ProgressUpdate) -> Result<(), PersistenceError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(PersistenceError::Unavailable("memory store write disabled".into()));
        }
        update.apply_to(inner.record.get_or_insert_with(ProgressRecord::default));
        inner.writes.push(update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn partial_updates_keep_other_fields() {
        let store = MemoryProgressStore::with_record(ProgressRecord {
            streak: 4,
            total_sessions: 9,
            ..Default::default()
        });
        store
            .update_progress(ProgressUpdate {
                last_session_elapsed_time: Some(12),
                ..Default::default()
            })
            .await
            .unwrap();

        let record = store.get_progress().await.unwrap().unwrap();
        assert_eq!(record.streak, 4);
        assert_eq!(record.total_sessions, 9);
        assert_eq!(record.last_session_elapsed_time, 12);
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let store = MemoryProgressStore::new();
        assert!(store.get_progress().await.unwrap().is_none());

        store.set_fail_writes(true);
        assert!(store.update_progress(ProgressUpdate::default()).await.is_err());
        assert!(store.record().is_none());

        store.set_fail_reads(true);
        assert!(matches!(
            store.get_progress().await,
            Err(PersistenceError::Unavailable(_))
        ));
    }
}
