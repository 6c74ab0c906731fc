//! Session driver wiring the clock, audio and progress together.
//!
//! [`spawn`] starts a single task that owns a [`BreathingSession`] and
//! serializes everything that touches it: the one-second ticker, commands
//! from [`SessionHandle`]s, and audio load completions. Progress writes go
//! to a separate serial writer task and are never awaited by the ticker.

mod driver;
mod state;
mod writer;

pub use driver::{spawn, SessionHandle};
pub use state::BreathingSession;

use std::time::Duration;

use serde::Serialize;

use crate::audio::{AudioSnapshot, AudioTrack};
use crate::progress::ProgressRecord;
use crate::storage::Config;
use crate::timer::{ClockSnapshot, ResumeOffer};

/// Everything a UI needs to render, taken at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub active: bool,
    pub clock: ClockSnapshot,
    pub audio: AudioSnapshot,
    pub resume_offer: Option<ResumeOffer>,
    pub progress: ProgressRecord,
}

/// Initial selection and tuning for a session driver.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Falls back to the catalog default when unknown.
    pub technique_id: Option<String>,
    /// Falls back to the catalog default when unknown.
    pub duration_minutes: Option<u32>,
    pub persist_every_ticks: u32,
    pub volume: f32,
    pub muted: bool,
    pub track: Option<AudioTrack>,
    pub tick_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            technique_id: None,
            duration_minutes: None,
            persist_every_ticks: 1,
            volume: 0.3,
            muted: false,
            track: None,
            tick_period: Duration::from_secs(1),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            technique_id: Some(config.session.default_technique.clone()),
            duration_minutes: Some(config.session.default_duration),
            persist_every_ticks: config.session.persist_every_ticks,
            volume: config.audio.volume,
            muted: config.audio.muted,
            track: config
                .audio
                .default_track
                .as_ref()
                .filter(|_| config.audio.enabled)
                .map(AudioTrack::from_uri),
            ..Self::default()
        }
    }
}
