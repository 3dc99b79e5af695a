//! Keyboard state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every frame the key
//!   is physically down. Scene movement only ever reads this, through the
//!   `CursorKeys` snapshot.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only during the
//!   frame the transition happened. Engine hotkeys (debug toggles, restart)
//!   read these. They are cleared by `end_frame()`, which the main loop calls
//!   only after at least one fixed step has consumed them, so a press landing
//!   on a frame with zero steps is not lost.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    F3,
    F4,
    R,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Drop every held key, e.g. when the window loses focus and release
    /// events will never arrive.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

/// Read-only snapshot of the four arrow keys, polled once per fixed step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl CursorKeys {
    pub fn poll(input: &InputState) -> Self {
        Self {
            left: input.is_held(Key::Left),
            right: input.is_held(Key::Right),
            up: input.is_held(Key::Up),
            down: input.is_held(Key::Down),
        }
    }
}
