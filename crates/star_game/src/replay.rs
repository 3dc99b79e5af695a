use serde::Deserialize;
use star_core::input::CursorKeys;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_cursors(&self) -> Vec<CursorKeys> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(CursorKeys {
                    left: frame.left,
                    right: frame.right,
                    up: frame.up,
                    down: frame.down,
                });
            }
        }
        out
    }

    pub fn fixed_dt_us(&self) -> u64 {
        (f64::from(self.fixed_dt) * 1_000_000.0).round() as u64
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tutorial_catalog;
    use crate::scene::SceneState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use star_core::config::{GameConfig, SceneVariant};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "starcatch_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn run_scene(replay: &ReplaySequence, seed: u64) -> SceneState {
        let config = GameConfig {
            variant: SceneVariant::Collect,
            ..GameConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene =
            SceneState::create(&config, &tutorial_catalog(), &mut rng).expect("scene create");
        for cursors in replay.expanded_cursors() {
            scene.step(cursors, replay.fixed_dt, replay.fixed_dt_us());
        }
        scene
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 3 },
                { "up": true, "repeat": 1 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_cursors();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].right);
        assert!(expanded[3].up);
        assert!(!expanded[3].right);
        assert_eq!(replay.fixed_dt_us(), 16_667);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "repeat": 90 },
                { "right": true, "repeat": 60 },
                { "right": true, "up": true, "repeat": 1 },
                { "right": true, "repeat": 120 },
                { "left": true, "repeat": 45 },
                { "repeat": 60 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let run_a = run_scene(&replay, 5);
        let run_b = run_scene(&replay, 5);

        let a = run_a.world.body(run_a.player_body);
        let b = run_b.world.body(run_b.player_body);
        assert!((a.position - b.position).length() < 0.0001);
        assert!((a.velocity - b.velocity).length() < 0.0001);
        assert_eq!(run_a.player_grounded(), run_b.player_grounded());
        assert_eq!(run_a.score(), run_b.score());
        assert_eq!(run_a.player.frame, run_b.player.frame);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn jump_arc_returns_to_the_ground() {
        let path = temp_file_path("jump");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "repeat": 120 },
                { "up": true, "repeat": 1 },
                { "repeat": 180 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let scene = run_scene(&replay, 9);
        let body = scene.world.body(scene.player_body);
        assert!(scene.player_grounded());
        assert!((body.bottom() - 536.0).abs() < 0.5);
        assert_eq!(body.center().x, 100.0);
        assert_eq!(scene.player_animation.current_key(), Some("turn"));

        let _ = fs::remove_file(path);
    }
}
