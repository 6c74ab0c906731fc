//! Rebuilds a mid-session state from a persisted elapsed time.
//!
//! Reconstruction is closed-form: the phase comes from the scheduler applied
//! to `elapsed % cycle`, the cycle count from `elapsed / cycle`. It never
//! replays ticks, and for every elapsed time it agrees with what continuous
//! ticking from zero would have produced.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::phase::phase_at;
use crate::catalog::{Catalog, DurationOption, Technique};
use crate::progress::ProgressRecord;

/// Derived clock position for an elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionPosition {
    pub elapsed_secs: u32,
    pub phase_index: usize,
    pub phase_remaining: u32,
    pub completed_cycles: u32,
}

impl SessionPosition {
    pub fn at(technique: &Technique, elapsed_secs: u32) -> Self {
        let phase = phase_at(technique, elapsed_secs);
        Self {
            elapsed_secs,
            phase_index: phase.phase_index,
            phase_remaining: phase.phase_remaining,
            completed_cycles: elapsed_secs / technique.cycle_secs(),
        }
    }
}

/// An interrupted session the user may continue or discard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeOffer {
    #[serde(skip_serializing)]
    pub technique: Arc<Technique>,
    pub technique_id: String,
    pub duration: DurationOption,
    pub total_secs: u32,
    #[serde(flatten)]
    pub position: SessionPosition,
}

/// Total length of a session in seconds.
pub fn total_session_secs(technique: &Technique, duration: DurationOption) -> u32 {
    technique.cycle_secs().saturating_mul(duration.cycles)
}

/// Offer for `elapsed_secs`, or `None` when nothing was started
/// (`elapsed == 0`) or the session already ran to its end.
pub fn reconstruct(
    technique: &Arc<Technique>,
    duration: DurationOption,
    elapsed_secs: u32,
) -> Option<ResumeOffer> {
    let total_secs = total_session_secs(technique, duration);
    if elapsed_secs == 0 || elapsed_secs >= total_secs {
        return None;
    }
    Some(ResumeOffer {
        technique: Arc::clone(technique),
        technique_id: technique.id().to_string(),
        duration,
        total_secs,
        position: SessionPosition::at(technique, elapsed_secs),
    })
}

/// Offer derived from a persisted progress record.
///
/// Unknown technique ids, unknown durations and out-of-range elapsed values
/// all mean "no resumable session".
pub fn offer_from_record(catalog: &Catalog, record: &ProgressRecord) -> Option<ResumeOffer> {
    let technique_id = record.last_selected_technique.as_deref()?;
    let minutes = record.last_selected_duration?;

    let Some(technique) = catalog.technique(technique_id) else {
        debug!(technique_id, "persisted technique not in catalog; no resume offer");
        return None;
    };
    let Some(duration) = catalog.duration(minutes) else {
        debug!(minutes, "persisted duration not in catalog; no resume offer");
        return None;
    };
    let Ok(elapsed) = u32::try_from(record.last_session_elapsed_time) else {
        debug!(
            elapsed = record.last_session_elapsed_time,
            "persisted elapsed time out of range; no resume offer"
        );
        return None;
    };

    reconstruct(technique, duration, elapsed)
}
