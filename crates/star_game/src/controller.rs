use crate::arcade::Body;
use star_core::animation::AnimationPlayer;
use star_core::input::CursorKeys;

pub const RUN_SPEED: f32 = 160.0;
pub const JUMP_SPEED: f32 = 330.0;

pub const ANIM_LEFT: &str = "left";
pub const ANIM_RIGHT: &str = "right";
pub const ANIM_TURN: &str = "turn";

/// What one update does to the player, derived from the cursor keys alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    pub velocity_x: f32,
    /// Vertical velocity to set this step, only when a jump starts.
    pub jump_velocity: Option<f32>,
    pub animation: &'static str,
    pub ignore_if_playing: bool,
}

/// Level-triggered decision table. Left wins when both directions are held;
/// `down` is ignored.
pub fn decide(cursors: CursorKeys, grounded: bool) -> ControlDecision {
    let (velocity_x, animation, ignore_if_playing) = if cursors.left {
        (-RUN_SPEED, ANIM_LEFT, true)
    } else if cursors.right {
        (RUN_SPEED, ANIM_RIGHT, true)
    } else {
        (0.0, ANIM_TURN, false)
    };

    let jump_velocity = (cursors.up && grounded).then_some(-JUMP_SPEED);

    ControlDecision {
        velocity_x,
        jump_velocity,
        animation,
        ignore_if_playing,
    }
}

pub fn apply(decision: &ControlDecision, body: &mut Body, animation: &mut AnimationPlayer) {
    body.velocity.x = decision.velocity_x;
    if let Some(vy) = decision.jump_velocity {
        body.velocity.y = vy;
    }
    animation.play(decision.animation, decision.ignore_if_playing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade::{Rect, World};
    use glam::Vec2;

    fn keys(left: bool, right: bool, up: bool) -> CursorKeys {
        CursorKeys {
            left,
            right,
            up,
            down: false,
        }
    }

    #[test]
    fn left_runs_left() {
        let d = decide(keys(true, false, false), true);
        assert_eq!(d.velocity_x, -160.0);
        assert_eq!(d.animation, "left");
        assert!(d.ignore_if_playing);
    }

    #[test]
    fn right_runs_right() {
        let d = decide(keys(false, true, false), false);
        assert_eq!(d.velocity_x, 160.0);
        assert_eq!(d.animation, "right");
        assert!(d.ignore_if_playing);
    }

    #[test]
    fn no_direction_stops_and_turns() {
        let d = decide(keys(false, false, false), true);
        assert_eq!(d.velocity_x, 0.0);
        assert_eq!(d.animation, "turn");
        assert!(!d.ignore_if_playing);
    }

    #[test]
    fn left_wins_over_right() {
        let d = decide(keys(true, true, false), true);
        assert_eq!(d.velocity_x, -160.0);
        assert_eq!(d.animation, "left");
    }

    #[test]
    fn jump_requires_up_and_ground() {
        assert_eq!(decide(keys(false, false, true), true).jump_velocity, Some(-330.0));
        assert_eq!(decide(keys(false, false, true), false).jump_velocity, None);
        assert_eq!(decide(keys(false, false, false), true).jump_velocity, None);
    }

    #[test]
    fn jump_is_independent_of_direction() {
        let d = decide(keys(false, true, true), true);
        assert_eq!(d.velocity_x, 160.0);
        assert_eq!(d.jump_velocity, Some(-330.0));
    }

    #[test]
    fn down_is_ignored() {
        let mut cursors = keys(false, false, false);
        cursors.down = true;
        assert_eq!(decide(cursors, true), decide(keys(false, false, false), true));
    }

    #[test]
    fn apply_sets_velocity_and_animation() {
        let mut world = World::new(Rect::new(0.0, 0.0, 800.0, 600.0), Vec2::new(0.0, 300.0));
        let id = world.add_dynamic(Vec2::new(100.0, 450.0), Vec2::new(32.0, 48.0));
        world.body_mut(id).velocity.y = 12.0;
        let mut player = AnimationPlayer::new();

        apply(&decide(keys(true, false, false), false), world.body_mut(id), &mut player);
        assert_eq!(world.body(id).velocity, Vec2::new(-160.0, 12.0));
        assert_eq!(player.current_key(), Some("left"));

        apply(&decide(keys(false, false, true), true), world.body_mut(id), &mut player);
        assert_eq!(world.body(id).velocity, Vec2::new(0.0, -330.0));
        assert_eq!(player.current_key(), Some("turn"));
    }

    #[test]
    fn holding_a_direction_does_not_restart_the_walk_cycle() {
        let mut world = World::new(Rect::new(0.0, 0.0, 800.0, 600.0), Vec2::ZERO);
        let id = world.add_dynamic(Vec2::new(100.0, 450.0), Vec2::new(32.0, 48.0));
        let mut player = AnimationPlayer::new();
        let right = decide(keys(false, true, false), true);
        apply(&right, world.body_mut(id), &mut player);
        assert!(!player.play(ANIM_RIGHT, true));
    }
}
