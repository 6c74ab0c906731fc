//! The session core: clock, audio and progress behind one command surface.
//!
//! Every command runs to completion on the driver's task. The clock is
//! mutated first; audio loads and progress writes are then handed off
//! without being awaited, and a fresh snapshot is published last.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::writer::PersistWriter;
use super::{SessionOptions, SessionSnapshot};
use crate::audio::{AudioCoordinator, AudioHandle, AudioLoader, AudioTrack, LoadRequest, Volume};
use crate::catalog::{Catalog, DurationOption, Technique};
use crate::error::{AudioError, SessionError};
use crate::events::Event;
use crate::progress::{ProgressAggregator, ProgressRecord};
use crate::storage::ProgressStore;
use crate::timer::{offer_from_record, ResumeOffer, SessionClock, SessionStatus};

/// Result of a spawned audio load, reported back to the driver.
pub(crate) struct LoadCompletion {
    pub token: u64,
    pub result: Result<Box<dyn AudioHandle>, AudioError>,
}

pub struct BreathingSession {
    catalog: Arc<Catalog>,
    clock: SessionClock,
    audio: AudioCoordinator,
    progress: ProgressAggregator,
    resume_offer: Option<ResumeOffer>,
    active: bool,
    store: Arc<dyn ProgressStore>,
    loader: Arc<dyn AudioLoader>,
    writer: PersistWriter,
    loads: mpsc::UnboundedSender<LoadCompletion>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<Event>,
}

impl BreathingSession {
    pub(crate) fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn ProgressStore>,
        loader: Arc<dyn AudioLoader>,
        options: &SessionOptions,
        writer: PersistWriter,
        loads: mpsc::UnboundedSender<LoadCompletion>,
    ) -> Self {
        let technique = options
            .technique_id
            .as_deref()
            .and_then(|id| catalog.technique(id))
            .unwrap_or_else(|| catalog.default_technique());
        let duration = options
            .duration_minutes
            .and_then(|m| catalog.duration(m))
            .unwrap_or_else(|| catalog.default_duration());
        let clock = SessionClock::new(Arc::clone(technique), duration);

        let mut volume = Volume::new(options.volume);
        if options.muted {
            volume.set_muted(true);
        }
        let mut audio = AudioCoordinator::new(volume);
        if let Some(track) = options.track.clone() {
            audio.select(track);
        }

        let progress = ProgressAggregator::new(ProgressRecord::default(), options.persist_every_ticks);
        let snapshot = SessionSnapshot {
            active: false,
            clock: clock.snapshot(),
            audio: audio.snapshot(),
            resume_offer: None,
            progress: progress.record().clone(),
        };
        let (snapshots, _) = watch::channel(snapshot);
        let (events, _) = broadcast::channel(64);

        Self {
            catalog,
            clock,
            audio,
            progress,
            resume_offer: None,
            active: false,
            store,
            loader,
            writer,
            loads,
            snapshots,
            events,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn audio(&self) -> &AudioCoordinator {
        &self.audio
    }

    pub fn progress(&self) -> &ProgressRecord {
        self.progress.record()
    }

    pub fn resume_offer(&self) -> Option<&ResumeOffer> {
        self.resume_offer.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.clock.status() == SessionStatus::Running
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active,
            clock: self.clock.snapshot(),
            audio: self.audio.snapshot(),
            resume_offer: self.resume_offer.clone(),
            progress: self.progress.record().clone(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Fetch the stored record and work out whether an interrupted session
    /// can be continued. A second call while active does nothing.
    pub async fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;

        match self.store.get_progress().await {
            Ok(Some(record)) => self.progress.replace(record),
            Ok(None) => debug!("no stored progress; starting from empty record"),
            Err(e) => warn!(error = %e, "failed to load progress; using in-memory record"),
        }

        if !self.clock.status().is_live() {
            self.restore_selection();
            self.resume_offer = offer_from_record(&self.catalog, self.progress.record());
            if let Some(offer) = &self.resume_offer {
                info!(
                    technique = %offer.technique_id,
                    elapsed = offer.position.elapsed_secs,
                    "interrupted session can be continued"
                );
            }
        }
        self.publish();
    }

    /// Stop ticking and release audio. The persisted elapsed time is left
    /// where the last write put it, so the next activation can offer to
    /// continue. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if !self.active && !self.clock.status().is_live() {
            return;
        }
        if self.clock.status().is_live() {
            let update = self.progress.flush(&self.clock);
            self.writer.submit(update);
        }
        self.clock.reset();
        self.audio.on_session_stopped();
        self.resume_offer = None;
        self.active = false;
        debug!("session deactivated");
        self.publish();
    }

    // ── Session commands ─────────────────────────────────────────────

    /// Start a fresh session. `None` keeps the current selection.
    pub fn start(
        &mut self,
        technique_id: Option<&str>,
        minutes: Option<u32>,
    ) -> Result<(), SessionError> {
        self.ensure_not_live("session")?;
        let technique = match technique_id {
            Some(id) => Some(self.lookup_technique(id)?),
            None => None,
        };
        let duration = match minutes {
            Some(m) => Some(self.lookup_duration(m)?),
            None => None,
        };
        if let Some(technique) = technique {
            self.clock.change_technique(technique)?;
        }
        if let Some(duration) = duration {
            self.clock.change_duration(duration)?;
        }

        self.resume_offer = None;
        let event = self.clock.start();
        let load = self.audio.on_session_started();
        self.dispatch_load(load);
        let update = self.progress.on_start(&self.clock);
        self.writer.submit(update);
        self.emit(event);
        self.publish();
        Ok(())
    }

    /// Accept the resume offer and continue where the last session stopped.
    pub fn continue_session(&mut self) -> Result<(), SessionError> {
        self.ensure_not_live("session")?;
        let offer = self.resume_offer.take().ok_or(SessionError::NoResumeOffer)?;

        let event = self.clock.restore(&offer);
        let load = self.audio.on_session_started();
        self.dispatch_load(load);
        let update = self.progress.on_start(&self.clock);
        self.writer.submit(update);
        self.emit(event);
        self.publish();
        Ok(())
    }

    /// Discard the resume offer and start its technique and duration fresh.
    pub fn start_over(&mut self) -> Result<(), SessionError> {
        self.ensure_not_live("session")?;
        let offer = self.resume_offer.take().ok_or(SessionError::NoResumeOffer)?;
        let update = self.progress.discard_resume();
        self.writer.submit(update);

        self.clock.change_technique(Arc::clone(&offer.technique))?;
        self.clock.change_duration(offer.duration)?;
        self.start(None, None)
    }

    pub fn pause(&mut self) {
        if let Some(event) = self.clock.pause() {
            self.audio.on_session_paused();
            let update = self.progress.flush(&self.clock);
            self.writer.submit(update);
            self.emit(event);
            self.publish();
        }
    }

    pub fn resume(&mut self) {
        if let Some(event) = self.clock.resume() {
            let load = self.audio.on_session_resumed();
            self.dispatch_load(load);
            self.emit(event);
            self.publish();
        }
    }

    /// Back to idle from any state. Only in-memory state is dropped; the
    /// stored position stays, so the next activation can still offer it.
    pub fn reset(&mut self) {
        let event = self.clock.reset();
        self.audio.on_session_stopped();
        self.resume_offer = None;
        self.emit(event);
        self.publish();
    }

    pub fn change_technique(&mut self, technique_id: &str) -> Result<(), SessionError> {
        let technique = self.lookup_technique(technique_id)?;
        self.clock.change_technique(technique)?;
        self.after_selection_change();
        Ok(())
    }

    pub fn change_duration(&mut self, minutes: u32) -> Result<(), SessionError> {
        let duration = self.lookup_duration(minutes)?;
        self.clock.change_duration(duration)?;
        self.after_selection_change();
        Ok(())
    }

    /// Advance the clock by one second.
    pub fn tick(&mut self) {
        let Some(event) = self.clock.tick() else {
            if self.clock.status() == SessionStatus::Running {
                if let Some(update) = self.progress.on_tick(&self.clock) {
                    self.writer.submit(update);
                }
                self.publish();
            }
            return;
        };

        if event.is_completion() {
            let update = self.progress.on_complete(&self.clock);
            self.writer.submit(update);
            self.audio.on_session_stopped();
        } else if let Some(update) = self.progress.on_tick(&self.clock) {
            self.writer.submit(update);
        }
        self.emit(event);
        self.publish();
    }

    // ── Audio commands ───────────────────────────────────────────────

    /// Choose the backing track, or clear it with `None`.
    pub fn select_audio(&mut self, track: Option<AudioTrack>) {
        match track {
            Some(track) => {
                let load = self.audio.select(track);
                self.dispatch_load(load);
            }
            None => self.audio.clear_selection(),
        }
        self.publish();
    }

    pub fn set_muted(&mut self, muted: bool) {
        let load = self.audio.set_muted(muted);
        self.dispatch_load(load);
        self.publish();
    }

    pub fn set_volume(&mut self, level: f32) {
        let load = self.audio.set_volume(level);
        self.dispatch_load(load);
        self.publish();
    }

    pub fn toggle_music_pause(&mut self) {
        let load = self.audio.toggle_music_pause();
        self.dispatch_load(load);
        self.publish();
    }

    pub(crate) fn finish_load(&mut self, completion: LoadCompletion) {
        self.audio.finish_load(completion.token, completion.result);
        self.publish();
    }

    /// Resolve once every progress write issued so far has been attempted.
    pub async fn flush_writes(&self) {
        self.writer.flush().await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lookup_technique(&self, id: &str) -> Result<Arc<Technique>, SessionError> {
        self.catalog
            .technique(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTechnique(id.to_string()))
    }

    fn lookup_duration(&self, minutes: u32) -> Result<DurationOption, SessionError> {
        self.catalog
            .duration(minutes)
            .ok_or(SessionError::UnknownDuration(minutes))
    }

    fn ensure_not_live(&self, what: &'static str) -> Result<(), SessionError> {
        let status = self.clock.status();
        if status.is_live() {
            return Err(SessionError::SessionActive {
                what,
                status: status.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Adopt the last technique and duration from the stored record when
    /// they still exist in the catalog.
    fn restore_selection(&mut self) {
        let record = self.progress.record();
        let technique = record
            .last_selected_technique
            .as_deref()
            .and_then(|id| self.catalog.technique(id))
            .cloned();
        let duration = record
            .last_selected_duration
            .and_then(|m| self.catalog.duration(m));

        if let Some(technique) = technique {
            if technique.id() != self.clock.technique().id() {
                if let Err(e) = self.clock.change_technique(technique) {
                    debug!(error = %e, "stored selection not restored");
                }
            }
        }
        if let Some(duration) = duration {
            if duration != self.clock.duration() {
                if let Err(e) = self.clock.change_duration(duration) {
                    debug!(error = %e, "stored selection not restored");
                }
            }
        }
    }

    fn after_selection_change(&mut self) {
        self.audio.on_session_stopped();
        self.resume_offer = None;
        let update = self
            .progress
            .on_selection(self.clock.technique().id(), self.clock.duration().minutes);
        self.writer.submit(update);
        self.publish();
    }

    fn dispatch_load(&self, request: Option<LoadRequest>) {
        let Some(LoadRequest { token, track }) = request else {
            return;
        };
        let loader = Arc::clone(&self.loader);
        let loads = self.loads.clone();
        tokio::spawn(async move {
            let result = loader.load(&track).await;
            // The driver may have shut down while the load was running.
            if let Err(mpsc::error::SendError(mut stale)) = loads.send(LoadCompletion { token, result }) {
                if let Ok(handle) = stale.result.as_mut() {
                    handle.unload();
                }
            }
        });
    }

    fn emit(&self, event: Event) {
        debug!(?event, "session event");
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
