//! Background track management.
//!
//! The coordinator is synchronous and never performs I/O itself; fetching
//! and decoding go through an [`AudioLoader`] supplied by the embedder.

mod coordinator;
mod source;
mod volume;

pub use coordinator::{AudioCoordinator, AudioSnapshot, LoadOutcome, LoadRequest};
pub use source::{AudioHandle, AudioLoader, AudioTrack, SilentHandle, SilentLoader};
pub use volume::Volume;
