//! Core error types for breathwork-core.
//!
//! Errors are grouped by concern. Catalog errors are fatal at startup;
//! audio and persistence errors are logged by the session driver and never
//! reach a running timer; session errors are returned to the command caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Technique catalog rejected at load time
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A session command could not be applied
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Audio resource load or playback failed
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Progress persistence failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed technique or duration definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog has no techniques")]
    NoTechniques,

    #[error("Catalog has no duration options")]
    NoDurations,

    #[error("Technique '{id}' has {count} phases; at least 2 are required")]
    TooFewPhases { id: String, count: usize },

    #[error("Technique '{id}' has {labels} phase labels but {durations} durations")]
    PhaseCountMismatch {
        id: String,
        labels: usize,
        durations: usize,
    },

    #[error("Technique '{id}' phase {index} has zero duration")]
    ZeroPhaseDuration { id: String, index: usize },

    #[error("Technique id must not be empty")]
    EmptyTechniqueId,

    #[error("Duplicate technique id '{0}'")]
    DuplicateTechnique(String),

    #[error("Duration option {minutes} min must have positive minutes and cycles (cycles: {cycles})")]
    InvalidDuration { minutes: u32, cycles: u32 },

    #[error("Duplicate duration option {0} min")]
    DuplicateDuration(u32),
}

/// Rejected session commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown technique '{0}'")]
    UnknownTechnique(String),

    #[error("No duration option for {0} minutes")]
    UnknownDuration(u32),

    /// Technique or duration changes require `reset()` while a session is live.
    #[error("Cannot change {what} while a session is {status}; reset first")]
    SessionActive { what: &'static str, status: String },

    #[error("No resumable session to continue")]
    NoResumeOffer,

    #[error("Session driver has shut down")]
    DriverClosed,
}

/// Audio resource failures. Always recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Failed to fetch audio '{uri}': {message}")]
    Fetch { uri: String, message: String },

    #[error("Failed to decode audio '{uri}': {message}")]
    Decode { uri: String, message: String },

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Progress store failures. Always recoverable; memory stays authoritative.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Request to progress service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Progress service answered {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Invalid progress service URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Progress database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to open progress database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Malformed progress record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Progress store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No usable data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
