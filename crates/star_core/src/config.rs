//! Game bootstrap configuration: canvas size, arcade physics settings and the
//! scene variant to run.
//!
//! The config file is optional. Every key has a default, so `{}` is a valid
//! file and a missing file simply means "use the defaults".

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Which of the two scenes to build.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SceneVariant {
    /// Platforms and a player only.
    Basic,
    /// Adds collectible stars and the score counter.
    #[default]
    Collect,
}

impl SceneVariant {
    pub fn has_collectibles(self) -> bool {
        matches!(self, Self::Collect)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GameConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_gravity_y")]
    pub gravity_y: f32,
    /// Draw physics body outlines.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub variant: SceneVariant,
    /// Fixed simulation steps per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_vsync")]
    pub vsync: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            gravity_y: default_gravity_y(),
            debug: false,
            variant: SceneVariant::default(),
            fps: default_fps(),
            vsync: default_vsync(),
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::info!(
            "Config '{}' not found, using built-in defaults",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    load_config_from_path(path)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.width == 0 || config.height == 0 {
        return Err("Config validation failed: width and height must be > 0".to_string());
    }
    if !config.gravity_y.is_finite() {
        return Err("Config validation failed: gravity_y must be finite".to_string());
    }
    if config.fps == 0 {
        return Err("Config validation failed: fps must be > 0".to_string());
    }
    Ok(())
}

/// Polls a file's mtime so edits can be picked up at a frame boundary.
pub struct FileWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

fn default_title() -> String {
    "starcatch".to_string()
}

const fn default_width() -> u32 {
    800
}

const fn default_height() -> u32 {
    600
}

const fn default_gravity_y() -> f32 {
    300.0
}

const fn default_fps() -> u32 {
    60
}

const fn default_vsync() -> bool {
    true
}
