//! Session clock implementation.
//!
//! The clock is a tick-driven state machine. It does not use internal
//! threads or read the wall clock for timing - the caller invokes `tick()`
//! once per elapsed second (or `tick_by(n)` to catch up).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Completed -> Idle
//!   ^________________ reset() ________________|
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut clock = SessionClock::new(technique, duration);
//! clock.start();
//! // Once per second:
//! if let Some(event) = clock.tick() { /* phase advanced or completed */ }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase::phase_at;
use super::resume::{total_session_secs, ResumeOffer};
use crate::catalog::{DurationOption, Technique};
use crate::error::SessionError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    /// Running or paused: a session exists and may not be reconfigured.
    pub fn is_live(self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Read-only view of the clock for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockSnapshot {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    pub technique_id: String,
    pub technique_name: String,
    pub duration_minutes: u32,
    pub phase_index: usize,
    pub phase_label: String,
    pub phase_remaining: u32,
    pub phase_duration: u32,
    pub elapsed_secs: u32,
    pub total_secs: u32,
    pub completed_cycles: u32,
    pub target_cycles: u32,
    pub progress_pct: f64,
    pub cycle_progress_pct: f64,
    pub started_at: Option<DateTime<Utc>>,
}

/// Core session state machine.
///
/// Owns every piece of mutable session state. Phase position, elapsed time
/// and cycle count change together inside a single method call, so a reader
/// never observes one without the others.
#[derive(Debug, Clone)]
pub struct SessionClock {
    technique: Arc<Technique>,
    duration: DurationOption,
    status: SessionStatus,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u32,
    phase_index: usize,
    phase_remaining: u32,
    completed_cycles: u32,
}

impl SessionClock {
    /// Create an idle clock positioned at the start of the first phase.
    pub fn new(technique: Arc<Technique>, duration: DurationOption) -> Self {
        let phase_remaining = technique.phase_duration(0);
        Self {
            technique,
            duration,
            status: SessionStatus::Idle,
            session_id: None,
            started_at: None,
            elapsed_secs: 0,
            phase_index: 0,
            phase_remaining,
            completed_cycles: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn technique(&self) -> &Arc<Technique> {
        &self.technique
    }

    pub fn duration(&self) -> DurationOption {
        self.duration
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn phase_remaining(&self) -> u32 {
        self.phase_remaining
    }

    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    pub fn total_secs(&self) -> u32 {
        total_session_secs(&self.technique, self.duration)
    }

    pub fn remaining_secs(&self) -> u32 {
        self.total_secs().saturating_sub(self.elapsed_secs)
    }

    pub fn current_label(&self) -> &str {
        self.technique.phase_label(self.phase_index)
    }

    /// 0.0 .. 100.0 progress across the whole session.
    pub fn progress_pct(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        (self.elapsed_secs as f64 / total as f64 * 100.0).min(100.0)
    }

    /// 0.0 .. 100.0 of the target cycle count completed.
    pub fn cycle_progress_pct(&self) -> f64 {
        if self.duration.cycles == 0 {
            return 0.0;
        }
        (self.completed_cycles as f64 / self.duration.cycles as f64 * 100.0).min(100.0)
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            session_id: self.session_id.clone(),
            status: self.status,
            technique_id: self.technique.id().to_string(),
            technique_name: self.technique.name().to_string(),
            duration_minutes: self.duration.minutes,
            phase_index: self.phase_index,
            phase_label: self.current_label().to_string(),
            phase_remaining: self.phase_remaining,
            phase_duration: self.technique.phase_duration(self.phase_index),
            elapsed_secs: self.elapsed_secs,
            total_secs: self.total_secs(),
            completed_cycles: self.completed_cycles,
            target_cycles: self.duration.cycles,
            progress_pct: self.progress_pct(),
            cycle_progress_pct: self.cycle_progress_pct(),
            started_at: self.started_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session from the first phase, discarding any prior state.
    pub fn start(&mut self) -> Event {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.rewind();
        self.status = SessionStatus::Running;
        self.session_id = Some(session_id.clone());
        self.started_at = Some(now);
        Event::SessionStarted {
            session_id,
            technique_id: self.technique.id().to_string(),
            duration_minutes: self.duration.minutes,
            total_secs: self.total_secs(),
            at: now,
        }
    }

    /// Enter `Running` directly at an accepted resume offer's position.
    pub fn restore(&mut self, offer: &ResumeOffer) -> Event {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        self.technique = Arc::clone(&offer.technique);
        self.duration = offer.duration;
        self.elapsed_secs = offer.position.elapsed_secs;
        self.phase_index = offer.position.phase_index;
        self.phase_remaining = offer.position.phase_remaining;
        self.completed_cycles = offer.position.completed_cycles;
        self.status = SessionStatus::Running;
        self.session_id = Some(session_id.clone());
        self.started_at = Some(now);
        Event::SessionRestored {
            session_id,
            technique_id: self.technique.id().to_string(),
            duration_minutes: self.duration.minutes,
            elapsed_secs: self.elapsed_secs,
            at: now,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.status {
            SessionStatus::Running => {
                self.status = SessionStatus::Paused;
                Some(Event::SessionPaused {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.status {
            SessionStatus::Paused => {
                self.status = SessionStatus::Running;
                Some(Event::SessionResumed {
                    elapsed_secs: self.elapsed_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Return to `Idle` from any state.
    pub fn reset(&mut self) -> Event {
        self.rewind();
        self.status = SessionStatus::Idle;
        self.session_id = None;
        self.started_at = None;
        Event::SessionReset { at: Utc::now() }
    }

    /// Switch technique. Only allowed when no session is live.
    pub fn change_technique(&mut self, technique: Arc<Technique>) -> Result<(), SessionError> {
        self.ensure_reconfigurable("technique")?;
        self.technique = technique;
        self.reset();
        Ok(())
    }

    /// Switch duration. Only allowed when no session is live.
    pub fn change_duration(&mut self, duration: DurationOption) -> Result<(), SessionError> {
        self.ensure_reconfigurable("duration")?;
        self.duration = duration;
        self.reset();
        Ok(())
    }

    /// Advance one second. Returns `Some(Event::SessionCompleted)` exactly
    /// once, on the tick that reaches the session length, and
    /// `Some(Event::PhaseAdvanced)` on phase boundaries. No-op unless running.
    pub fn tick(&mut self) -> Option<Event> {
        if self.status != SessionStatus::Running {
            return None;
        }

        let total = self.total_secs();
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);

        if self.elapsed_secs >= total {
            self.elapsed_secs = total;
            let end = phase_at(&self.technique, total);
            self.phase_index = end.phase_index;
            self.phase_remaining = end.phase_remaining;
            self.completed_cycles = total / self.technique.cycle_secs();
            self.status = SessionStatus::Completed;
            return Some(Event::SessionCompleted {
                session_id: self.session_id.clone().unwrap_or_default(),
                technique_id: self.technique.id().to_string(),
                duration_minutes: self.duration.minutes,
                total_secs: total,
                completed_cycles: self.completed_cycles,
                at: Utc::now(),
            });
        }

        self.completed_cycles = self.elapsed_secs / self.technique.cycle_secs();
        self.phase_remaining = self.phase_remaining.saturating_sub(1);
        if self.phase_remaining == 0 {
            self.phase_index = (self.phase_index + 1) % self.technique.phase_count();
            self.phase_remaining = self.technique.phase_duration(self.phase_index);
            return Some(Event::PhaseAdvanced {
                phase_index: self.phase_index,
                label: self.current_label().to_string(),
                duration_secs: self.phase_remaining,
                completed_cycles: self.completed_cycles,
                at: Utc::now(),
            });
        }
        None
    }

    /// Advance `delta_secs` seconds, stopping early on completion or if the
    /// clock is not running.
    pub fn tick_by(&mut self, delta_secs: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..delta_secs {
            if self.status != SessionStatus::Running {
                break;
            }
            if let Some(event) = self.tick() {
                events.push(event);
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rewind(&mut self) {
        self.elapsed_secs = 0;
        self.phase_index = 0;
        self.phase_remaining = self.technique.phase_duration(0);
        self.completed_cycles = 0;
    }

    fn ensure_reconfigurable(&self, what: &'static str) -> Result<(), SessionError> {
        if self.status.is_live() {
            return Err(SessionError::SessionActive {
                what,
                status: self.status.as_str().to_string(),
            });
        }
        Ok(())
    }
}
