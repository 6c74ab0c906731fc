//! # Breathwork Core Library
//!
//! This library provides the core logic for Breathwork, a guided breathing
//! session engine. Every operation is available through the standalone CLI
//! binary; any other front end is a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Catalog**: validated techniques (timed phase sequences) and duration
//!   presets expressed as cycle counts
//! - **Timer**: a tick-driven session clock, the phase scheduler, and resume
//!   reconstruction from a persisted elapsed time
//! - **Audio**: a coordinator keeping at most one backing track loaded, with
//!   load tokens that discard superseded loads
//! - **Progress**: streak and session counters persisted through a
//!   [`ProgressStore`]
//! - **Session**: a tokio driver that owns all of the above on one task
//!
//! ## Key Components
//!
//! - [`SessionClock`]: Core session state machine
//! - [`AudioCoordinator`]: Background track lifecycle
//! - [`ProgressAggregator`]: Counter updates and persistence decisions
//! - [`SessionHandle`]: Command surface of a running driver
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod catalog;
pub mod error;
pub mod events;
pub mod progress;
pub mod session;
pub mod storage;
pub mod timer;

pub use audio::{AudioCoordinator, AudioHandle, AudioLoader, AudioTrack, SilentLoader, Volume};
pub use catalog::{Catalog, Difficulty, DurationOption, Technique, TechniqueSpec};
pub use error::{AudioError, CatalogError, ConfigError, CoreError, PersistenceError, SessionError};
pub use events::Event;
pub use progress::{ProgressAggregator, ProgressRecord, ProgressUpdate};
pub use session::{BreathingSession, SessionHandle, SessionOptions, SessionSnapshot};
pub use storage::{
    Config, HttpProgressStore, MemoryProgressStore, ProgressStore, SqliteProgressStore,
};
pub use timer::{ResumeOffer, SessionClock, SessionStatus};
