mod engine;
mod phase;
mod resume;

pub use engine::{ClockSnapshot, SessionClock, SessionStatus};
pub use phase::{compute_phase, phase_at, PhasePosition};
pub use resume::{
    offer_from_record, reconstruct, total_session_secs, ResumeOffer, SessionPosition,
};

/// Format seconds as `m:ss` for countdown display.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
