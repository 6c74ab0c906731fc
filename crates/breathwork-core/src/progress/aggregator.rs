use chrono::Utc;
use tracing::info;

use super::record::{ProgressRecord, ProgressUpdate};
use crate::timer::SessionClock;

/// Accumulates counters and decides what to write after each clock event.
///
/// Counters are updated optimistically in memory; the returned updates are
/// handed to the persistence writer and a failed write never rolls them back.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    record: ProgressRecord,
    persist_every_ticks: u32,
    ticks_since_persist: u32,
}

impl ProgressAggregator {
    /// `persist_every_ticks` of 0 or 1 persists on every tick.
    pub fn new(record: ProgressRecord, persist_every_ticks: u32) -> Self {
        Self {
            record,
            persist_every_ticks: persist_every_ticks.max(1),
            ticks_since_persist: 0,
        }
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    /// Replace the in-memory record with a freshly fetched one.
    pub fn replace(&mut self, record: ProgressRecord) {
        self.record = record;
        self.ticks_since_persist = 0;
    }

    /// A session started or was restored.
    pub fn on_start(&mut self, clock: &SessionClock) -> ProgressUpdate {
        self.ticks_since_persist = 0;
        self.position_update(clock)
    }

    /// Called after every tick that did not complete the session.
    pub fn on_tick(&mut self, clock: &SessionClock) -> Option<ProgressUpdate> {
        self.ticks_since_persist += 1;
        if self.ticks_since_persist < self.persist_every_ticks {
            return None;
        }
        self.ticks_since_persist = 0;
        Some(self.position_update(clock))
    }

    /// Write the exact current position regardless of throttling.
    pub fn flush(&mut self, clock: &SessionClock) -> ProgressUpdate {
        self.ticks_since_persist = 0;
        self.position_update(clock)
    }

    /// Session reached its end: bump every counter and persist the whole record.
    pub fn on_complete(&mut self, clock: &SessionClock) -> ProgressUpdate {
        let technique_id = clock.technique().id().to_string();
        self.record.streak += 1;
        self.record.total_sessions += 1;
        *self
            .record
            .per_technique_sessions
            .entry(technique_id.clone())
            .or_insert(0) += 1;
        self.sync_position(clock);
        self.ticks_since_persist = 0;

        info!(
            technique = %technique_id,
            streak = self.record.streak,
            total_sessions = self.record.total_sessions,
            "breathing session completed"
        );
        self.record.to_update()
    }

    /// The user chose "start over": forget the interrupted session.
    pub fn discard_resume(&mut self) -> ProgressUpdate {
        self.record.last_session_elapsed_time = 0;
        ProgressUpdate {
            last_session_elapsed_time: Some(0),
            last_session: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Technique or duration changed while idle.
    pub fn on_selection(&mut self, technique_id: &str, minutes: u32) -> ProgressUpdate {
        self.record.last_selected_technique = Some(technique_id.to_string());
        self.record.last_selected_duration = Some(minutes);
        ProgressUpdate {
            last_selected_technique: Some(technique_id.to_string()),
            last_selected_duration: Some(minutes),
            ..Default::default()
        }
    }

    fn position_update(&mut self, clock: &SessionClock) -> ProgressUpdate {
        self.sync_position(clock);
        ProgressUpdate {
            last_selected_technique: self.record.last_selected_technique.clone(),
            last_selected_duration: self.record.last_selected_duration,
            last_session_elapsed_time: Some(self.record.last_session_elapsed_time),
            last_session_start_time: self.record.last_session_start_time,
            last_session: self.record.last_session,
            ..Default::default()
        }
    }

    fn sync_position(&mut self, clock: &SessionClock) {
        self.record.last_selected_technique = Some(clock.technique().id().to_string());
        self.record.last_selected_duration = Some(clock.duration().minutes);
        self.record.last_session_elapsed_time = i64::from(clock.elapsed_secs());
        self.record.last_session_start_time = clock.started_at();
        self.record.last_session = Some(Utc::now());
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(ProgressRecord::default(), 1)
    }
}
