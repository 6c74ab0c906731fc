use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every session clock transition produces an Event.
/// The driver fans them out to the progress aggregator and the audio
/// coordinator; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: String,
        technique_id: String,
        duration_minutes: u32,
        total_secs: u32,
        at: DateTime<Utc>,
    },
    /// Session entered mid-way from an accepted resume offer.
    SessionRestored {
        session_id: String,
        technique_id: String,
        duration_minutes: u32,
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    PhaseAdvanced {
        phase_index: usize,
        label: String,
        duration_secs: u32,
        completed_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        technique_id: String,
        duration_minutes: u32,
        total_secs: u32,
        completed_cycles: u32,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::SessionCompleted { .. })
    }
}
