//! Keeps at most one backing track loaded and in step with the session.
//!
//! Loads are asynchronous and owned by the caller: every operation that needs
//! a fetch returns a [`LoadRequest`] carrying a token, and the result comes
//! back through [`AudioCoordinator::finish_load`]. Only the most recently
//! issued token may become the active resource.

use serde::Serialize;
use tracing::{debug, warn};

use super::source::{AudioHandle, AudioTrack};
use super::volume::Volume;
use crate::error::AudioError;

/// A fetch the caller must perform and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: u64,
    pub track: AudioTrack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The handle became the active resource.
    Activated,
    /// A newer load superseded this one; the handle was unloaded.
    Discarded,
    /// The load failed; no audio until the next load.
    Failed(AudioError),
}

struct ActiveTrack {
    track: AudioTrack,
    handle: Box<dyn AudioHandle>,
    playing: bool,
}

/// Read-only view published alongside the clock snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSnapshot {
    pub selected_track: Option<AudioTrack>,
    pub active_track_id: Option<String>,
    pub loading: bool,
    pub playing: bool,
    pub muted: bool,
    pub volume: f32,
    pub music_paused: bool,
}

pub struct AudioCoordinator {
    selected: Option<AudioTrack>,
    active: Option<ActiveTrack>,
    load_token: u64,
    pending: Option<u64>,
    volume: Volume,
    session_running: bool,
    music_paused: bool,
}

impl AudioCoordinator {
    pub fn new(volume: Volume) -> Self {
        Self {
            selected: None,
            active: None,
            load_token: 0,
            pending: None,
            volume,
            session_running: false,
            music_paused: false,
        }
    }

    pub fn selected(&self) -> Option<&AudioTrack> {
        self.selected.as_ref()
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn load_token(&self) -> u64 {
        self.load_token
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.playing)
    }

    pub fn is_music_paused(&self) -> bool {
        self.music_paused
    }

    /// Whether the user-facing flags allow sound while the session runs.
    fn audible(&self) -> bool {
        !self.music_paused && !self.volume.is_muted()
    }

    fn should_play(&self) -> bool {
        self.session_running && self.audible()
    }

    /// Record the user's choice. A different track releases whatever is
    /// loaded and clears music pause.
    pub fn select(&mut self, track: AudioTrack) -> Option<LoadRequest> {
        let same = self.selected.as_ref() == Some(&track);
        self.selected = Some(track);
        if !same {
            self.teardown();
            self.music_paused = false;
        }
        self.ensure_loaded()
    }

    /// Clear the selection and release the resource.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.teardown();
    }

    /// Accept a finished load. Stale tokens are unloaded without touching
    /// playback.
    pub fn finish_load(
        &mut self,
        token: u64,
        result: Result<Box<dyn AudioHandle>, AudioError>,
    ) -> LoadOutcome {
        if token != self.load_token || self.pending != Some(token) {
            debug!(token, current = self.load_token, "discarding stale audio load");
            if let Ok(mut handle) = result {
                handle.unload();
            }
            return LoadOutcome::Discarded;
        }
        self.pending = None;

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "audio load failed; continuing without audio");
                return LoadOutcome::Failed(e);
            }
        };
        let Some(track) = self.selected.clone() else {
            let mut handle = handle;
            handle.unload();
            return LoadOutcome::Discarded;
        };

        self.active = Some(ActiveTrack {
            track,
            handle,
            playing: false,
        });
        self.apply();
        if self.active.is_some() {
            LoadOutcome::Activated
        } else {
            LoadOutcome::Failed(AudioError::Playback("resource rejected playback".into()))
        }
    }

    /// A fresh session (or a restored one) started running.
    pub fn on_session_started(&mut self) -> Option<LoadRequest> {
        self.teardown();
        self.session_running = true;
        self.music_paused = false;
        self.ensure_loaded()
    }

    pub fn on_session_paused(&mut self) {
        self.session_running = false;
        self.apply();
    }

    pub fn on_session_resumed(&mut self) -> Option<LoadRequest> {
        self.session_running = true;
        self.apply();
        self.ensure_loaded()
    }

    /// Reset, completion, technique change or deactivation.
    pub fn on_session_stopped(&mut self) {
        self.session_running = false;
        self.teardown();
    }

    /// Resume the backing track without touching the session.
    pub fn play(&mut self) -> Option<LoadRequest> {
        self.music_paused = false;
        self.apply();
        self.ensure_loaded()
    }

    /// Pause the backing track without touching the session.
    pub fn pause(&mut self) {
        self.music_paused = true;
        self.apply();
    }

    pub fn toggle_music_pause(&mut self) -> Option<LoadRequest> {
        if self.music_paused {
            self.play()
        } else {
            self.pause();
            None
        }
    }

    pub fn set_muted(&mut self, muted: bool) -> Option<LoadRequest> {
        self.volume.set_muted(muted);
        self.apply();
        self.ensure_loaded()
    }

    pub fn set_volume(&mut self, level: f32) -> Option<LoadRequest> {
        self.volume.set_level(level);
        self.apply();
        self.ensure_loaded()
    }

    pub fn snapshot(&self) -> AudioSnapshot {
        AudioSnapshot {
            selected_track: self.selected.clone(),
            active_track_id: self.active.as_ref().map(|a| a.track.id.clone()),
            loading: self.is_loading(),
            playing: self.is_playing(),
            muted: self.volume.is_muted(),
            volume: self.volume.level(),
            music_paused: self.music_paused,
        }
    }

    /// Unload the active resource and invalidate any in-flight load.
    pub fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!(track = %active.track.id, "unloading audio");
            active.handle.unload();
        }
        if self.pending.take().is_some() {
            self.load_token += 1;
        }
    }

    /// Issue a load when sound is wanted and nothing is loaded or loading.
    fn ensure_loaded(&mut self) -> Option<LoadRequest> {
        if !self.should_play() || self.active.is_some() || self.pending.is_some() {
            return None;
        }
        let track = self.selected.clone()?;
        self.load_token += 1;
        self.pending = Some(self.load_token);
        debug!(token = self.load_token, track = %track.id, "loading audio");
        Some(LoadRequest {
            token: self.load_token,
            track,
        })
    }

    /// Push volume and play state into the active handle. A handle that
    /// errors is released and audio stays off until the next load.
    fn apply(&mut self) {
        let gain = self.volume.gain();
        let play = self.should_play();
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let result = active.handle.set_volume(gain).and_then(|()| {
            if play {
                active.handle.play()
            } else {
                active.handle.pause()
            }
        });
        match result {
            Ok(()) => active.playing = play,
            Err(e) => {
                warn!(track = %active.track.id, error = %e, "audio playback failed; disabling track");
                if let Some(mut failed) = self.active.take() {
                    failed.handle.unload();
                }
            }
        }
    }
}

impl Default for AudioCoordinator {
    fn default() -> Self {
        Self::new(Volume::default())
    }
}

impl Drop for AudioCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for AudioCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCoordinator")
            .field("selected", &self.selected)
            .field("active", &self.active.as_ref().map(|a| &a.track.id))
            .field("load_token", &self.load_token)
            .field("pending", &self.pending)
            .field("volume", &self.volume)
            .field("session_running", &self.session_running)
            .field("music_paused", &self.music_paused)
            .finish()
    }
}
