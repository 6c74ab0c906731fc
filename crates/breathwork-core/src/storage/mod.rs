//! Progress persistence and on-disk configuration.

mod config;
pub mod http;
pub mod memory;
pub mod sqlite;

pub use config::{AudioConfig, Config, PersistenceBackend, PersistenceConfig, SessionConfig};
pub use http::HttpProgressStore;
pub use memory::MemoryProgressStore;
pub use sqlite::SqliteProgressStore;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{ConfigError, PersistenceError};
use crate::progress::{ProgressRecord, ProgressUpdate};

/// Key-value persistence service holding one progress record per user.
///
/// `update_progress` has partial-set semantics: fields absent from the
/// update keep their stored value.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `None` when nothing has been stored yet.
    async fn get_progress(&self) -> Result<Option<ProgressRecord>, PersistenceError>;

    async fn update_progress(&self, update: ProgressUpdate) -> Result<(), PersistenceError>;
}

/// Returns `~/.config/breathwork[-dev]/` based on BREATHWORK_ENV.
///
/// Set BREATHWORK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BREATHWORK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("breathwork-dev")
    } else {
        base_dir.join("breathwork")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
