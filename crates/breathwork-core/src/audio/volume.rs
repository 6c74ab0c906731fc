//! Volume with mute that preserves the last audible level.
//!
//! Volume 0 and mute are the same state seen from two sides: dropping the
//! level to 0 mutes, and unmuting from 0 restores the last non-zero level.

use serde::Serialize;

const DEFAULT_LEVEL: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Volume {
    /// 0.0 ..= 1.0
    level: f32,
    /// Last level above zero, restored on unmute.
    last_audible: f32,
    muted: bool,
}

impl Volume {
    pub fn new(level: f32) -> Self {
        let mut volume = Self {
            level: DEFAULT_LEVEL,
            last_audible: DEFAULT_LEVEL,
            muted: false,
        };
        volume.set_level(level);
        volume
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Clamp to 0..=1. Zero mutes; anything above zero unmutes.
    pub fn set_level(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.level = level;
        if level == 0.0 {
            self.muted = true;
        } else {
            self.last_audible = level;
            self.muted = false;
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if !muted && self.level == 0.0 {
            self.level = self.last_audible;
        }
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.muted);
    }

    /// Gain to hand to the output: 0.0 while muted.
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_level_mutes() {
        let mut v = Volume::new(0.5);
        v.set_level(0.0);
        assert!(v.is_muted());
        assert_eq!(v.gain(), 0.0);
    }

    #[test]
    fn unmute_restores_last_audible_level() {
        let mut v = Volume::new(0.6);
        v.set_level(0.0);
        v.set_muted(false);
        assert!(!v.is_muted());
        assert_eq!(v.level(), 0.6);
        assert_eq!(v.gain(), 0.6);
    }

    #[test]
    fn mute_keeps_level() {
        let mut v = Volume::new(0.4);
        v.toggle_mute();
        assert!(v.is_muted());
        assert_eq!(v.level(), 0.4);
        assert_eq!(v.gain(), 0.0);
        v.toggle_mute();
        assert_eq!(v.gain(), 0.4);
    }

    #[test]
    fn raising_level_unmutes() {
        let mut v = Volume::new(0.4);
        v.set_muted(true);
        v.set_level(0.2);
        assert!(!v.is_muted());
        assert_eq!(v.gain(), 0.2);
    }

    #[test]
    fn clamps_out_of_range() {
        let mut v = Volume::new(3.0);
        assert_eq!(v.level(), 1.0);
        v.set_level(-1.0);
        assert!(v.is_muted());
        v.set_level(f32::NAN);
        assert_eq!(v.level(), 0.0);
        assert_eq!(Volume::new(0.0).is_muted(), true);
    }
}
