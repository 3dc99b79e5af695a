//! Sprite-sheet animation clips and deterministic playback.
//!
//! A clip is a list of frame numbers into one sprite sheet, a frame rate and a
//! repeat count (`-1` loops forever, `n` plays the clip `n` extra times).
//! All timing uses integer microseconds so advancement under the fixed
//! timestep is identical across platforms.

use std::collections::HashMap;

/// Inclusive run of sheet frame numbers, `start..=end`.
pub fn generate_frame_numbers(start: u32, end: u32) -> Vec<u32> {
    (start..=end).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationClip {
    pub frames: Vec<u32>,
    pub frame_rate: u32,
    pub repeat: i32,
}

impl AnimationClip {
    pub const REPEAT_FOREVER: i32 = -1;

    pub fn frame_duration_us(&self) -> u64 {
        1_000_000 / u64::from(self.frame_rate.max(1))
    }

    /// Duration of one pass over the frames in microseconds.
    pub fn total_duration_us(&self) -> u64 {
        self.frame_duration_us() * self.frames.len() as u64
    }

    pub fn loops_forever(&self) -> bool {
        self.repeat < 0
    }
}

/// Clips by key. Keys are global to the scene, like the sheet they animate.
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    clips: HashMap<String, AnimationClip>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `clip` under `key`. An existing key is never replaced.
    pub fn create(&mut self, key: &str, clip: AnimationClip) -> Result<(), String> {
        if key.is_empty() {
            return Err("Animation validation failed: key is empty".to_string());
        }
        if clip.frames.is_empty() {
            return Err(format!(
                "Animation validation failed: clip '{key}' has no frames"
            ));
        }
        if clip.frame_rate == 0 {
            return Err(format!(
                "Animation validation failed: clip '{key}' has zero frame rate"
            ));
        }
        if self.clips.contains_key(key) {
            return Err(format!(
                "Animation validation failed: duplicate animation key '{key}'"
            ));
        }
        self.clips.insert(key.to_string(), clip);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&AnimationClip> {
        self.clips.get(key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Check every clip only references frames that exist in a sheet of
    /// `frame_count` frames.
    pub fn validate_frames(&self, frame_count: u32) -> Result<(), String> {
        for (key, clip) in &self.clips {
            if let Some(&frame) = clip.frames.iter().find(|&&f| f >= frame_count) {
                return Err(format!(
                    "Animation '{key}' references frame {frame} but the sheet has {frame_count} frames"
                ));
            }
        }
        Ok(())
    }
}

/// Playback state of the single animation attached to a sprite.
#[derive(Debug, Clone, Default)]
pub struct AnimationPlayer {
    current: Option<String>,
    frame_index: usize,
    elapsed_us: u64,
    repeats_done: u32,
    playing: bool,
}

impl AnimationPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `key`. With `ignore_if_playing`, a clip that is already current
    /// and still running is left alone; otherwise playback restarts at its
    /// first frame. Returns whether playback (re)started.
    pub fn play(&mut self, key: &str, ignore_if_playing: bool) -> bool {
        if ignore_if_playing && self.playing && self.current.as_deref() == Some(key) {
            return false;
        }
        if self.current.as_deref() != Some(key) {
            self.current = Some(key.to_string());
        }
        self.frame_index = 0;
        self.elapsed_us = 0;
        self.repeats_done = 0;
        self.playing = true;
        true
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Sheet frame currently shown, if the current clip exists.
    pub fn current_frame(&self, registry: &AnimationRegistry) -> Option<u32> {
        let clip = registry.get(self.current.as_deref()?)?;
        clip.frames.get(self.frame_index).copied()
    }

    /// Advance by `dt_us` microseconds and return the sheet frame to show.
    pub fn tick(&mut self, dt_us: u64, registry: &AnimationRegistry) -> Option<u32> {
        let clip = registry.get(self.current.as_deref()?)?;
        if !self.playing || clip.frames.is_empty() {
            return clip.frames.get(self.frame_index).copied();
        }

        let frame_us = clip.frame_duration_us();
        self.elapsed_us += dt_us;

        while self.elapsed_us >= frame_us {
            self.elapsed_us -= frame_us;
            if self.frame_index + 1 < clip.frames.len() {
                self.frame_index += 1;
                continue;
            }

            let may_repeat =
                clip.loops_forever() || i64::from(self.repeats_done) < i64::from(clip.repeat);
            if may_repeat {
                self.repeats_done = self.repeats_done.saturating_add(1);
                self.frame_index = 0;
            } else {
                self.elapsed_us = 0;
                self.playing = false;
                break;
            }
        }

        clip.frames.get(self.frame_index).copied()
    }
}
