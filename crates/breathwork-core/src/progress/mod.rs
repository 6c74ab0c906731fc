//! Streak, session and per-technique counters plus the resume snapshot.

mod aggregator;
mod milestones;
mod record;

pub use aggregator::ProgressAggregator;
pub use milestones::{achievements, completion_message, next_goal, streak_message, Achievement};
pub use record::{ProgressRecord, ProgressUpdate, TechniqueCount};
