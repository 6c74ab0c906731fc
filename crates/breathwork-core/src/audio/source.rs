use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// A backing track the user can pick. `uri` is an http(s) URL or a file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    pub name: String,
    pub uri: String,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uri: uri.into(),
        }
    }

    /// Track whose id and name are both the URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            id: uri.clone(),
            name: uri.clone(),
            uri,
        }
    }
}

/// A loaded, playable resource. Loops until unloaded.
pub trait AudioHandle: Send {
    fn play(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self) -> Result<(), AudioError>;

    /// `gain` is already clamped to 0.0..=1.0.
    fn set_volume(&mut self, gain: f32) -> Result<(), AudioError>;

    /// Stop and release the resource. Called exactly once per handle.
    fn unload(&mut self);
}

/// Fetches and decodes a track into a handle.
#[async_trait]
pub trait AudioLoader: Send + Sync {
    async fn load(&self, track: &AudioTrack) -> Result<Box<dyn AudioHandle>, AudioError>;
}

/// Loader used when audio output is disabled. Every load succeeds with a
/// handle that produces no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentLoader;

#[derive(Debug, Default)]
pub struct SilentHandle;

impl AudioHandle for SilentHandle {
    fn play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_volume(&mut self, _gain: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn unload(&mut self) {}
}

#[async_trait]
impl AudioLoader for SilentLoader {
    async fn load(&self, _track: &AudioTrack) -> Result<Box<dyn AudioHandle>, AudioError> {
        Ok(Box::new(SilentHandle))
    }
}
