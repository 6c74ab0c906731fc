pub mod config;
pub mod progress;
pub mod session;
pub mod technique;

use std::sync::Arc;

use breathwork_core::storage::PersistenceBackend;
use breathwork_core::{Config, HttpProgressStore, ProgressStore, SqliteProgressStore};

/// Open the progress backend named in the config.
pub(crate) fn progress_store(
    config: &Config,
) -> Result<Arc<dyn ProgressStore>, Box<dyn std::error::Error>> {
    match config.persistence.backend {
        PersistenceBackend::Sqlite => Ok(Arc::new(SqliteProgressStore::open()?)),
        PersistenceBackend::Http => {
            let base_url = config
                .persistence
                .base_url
                .as_deref()
                .ok_or("persistence.base_url must be set for the http backend")?;
            let token = std::env::var(&config.persistence.token_env).ok();
            if token.is_none() {
                tracing::warn!(
                    var = %config.persistence.token_env,
                    "no token in environment; requests will be unauthenticated"
                );
            }
            Ok(Arc::new(HttpProgressStore::new(base_url, token)?))
        }
    }
}

/// Build a current-thread runtime for one command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
