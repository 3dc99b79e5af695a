//! Stars and the score counter of the collect variant.

use crate::arcade::{BodyId, ColliderId, OverlapEvent, World};
use crate::assets::STAR;
use crate::scene::{Sprite, TextLabel};
use glam::Vec2;
use rand::Rng;

pub const STAR_COUNT: usize = 12;
pub const STAR_START_X: f32 = 12.0;
pub const STAR_STEP_X: f32 = 70.0;
pub const STAR_BOUNCE_MIN: f32 = 0.4;
pub const STAR_BOUNCE_MAX: f32 = 0.8;
pub const SCORE_PER_STAR: u32 = 10;

pub const SCORE_TEXT_POSITION: Vec2 = Vec2::new(16.0, 16.0);
pub const SCORE_TEXT_SIZE_PX: f32 = 32.0;
const SCORE_TEXT_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Spawn point of star `index`.
pub fn star_position(index: usize) -> Vec2 {
    Vec2::new(STAR_START_X + STAR_STEP_X * index as f32, 0.0)
}

pub fn random_bounce<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(STAR_BOUNCE_MIN..=STAR_BOUNCE_MAX)
}

#[derive(Debug, Clone)]
pub struct Star {
    pub sprite: Sprite,
    pub body: BodyId,
}

#[derive(Debug, Clone)]
pub struct ScoreBoard {
    score: u32,
    pub label: TextLabel,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self {
            score: 0,
            // Lower-case until the first pickup rewrites it.
            label: TextLabel {
                text: "score: 0".to_string(),
                position: SCORE_TEXT_POSITION,
                size_px: SCORE_TEXT_SIZE_PX,
                color: SCORE_TEXT_COLOR,
            },
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add(&mut self, points: u32) {
        self.score += points;
        self.label.text = format!("Score: {}", self.score);
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Collectibles {
    pub stars: Vec<Star>,
    pub score: ScoreBoard,
    player_stars: ColliderId,
}

impl Collectibles {
    /// Drop the row of stars, collide them with `platforms` and watch
    /// `player` for pickups.
    pub fn spawn<R: Rng>(
        world: &mut World,
        player: BodyId,
        platforms: &[BodyId],
        star_size: Vec2,
        rng: &mut R,
    ) -> Result<Self, String> {
        let mut stars = Vec::with_capacity(STAR_COUNT);
        for index in 0..STAR_COUNT {
            let position = star_position(index);
            let body = world.add_dynamic(position, star_size);
            world.body_mut(body).bounce.y = random_bounce(rng);
            stars.push(Star {
                sprite: Sprite::new(STAR, position, star_size).with_body(body),
                body,
            });
        }

        let star_ids: Vec<BodyId> = stars.iter().map(|s| s.body).collect();
        world.add_collider(&star_ids, platforms)?;
        let player_stars = world.add_overlap(&[player], &star_ids);

        Ok(Self {
            stars,
            score: ScoreBoard::new(),
            player_stars,
        })
    }

    /// Route an overlap from the physics step; returns whether a star was
    /// collected.
    pub fn handle_overlap(&mut self, world: &mut World, event: &OverlapEvent) -> bool {
        if event.collider != self.player_stars {
            return false;
        }
        self.collect_star(world, event.b)
    }

    /// Disable `star`, hide it and add its points. A star that is already
    /// disabled is left alone.
    pub fn collect_star(&mut self, world: &mut World, star: BodyId) -> bool {
        let Some(entry) = self.stars.iter_mut().find(|s| s.body == star) else {
            return false;
        };
        if !world.body(star).enabled {
            return false;
        }
        world.disable(star);
        entry.sprite.visible = false;
        self.score.add(SCORE_PER_STAR);
        log::debug!("Star collected, score is now {}", self.score.score());
        true
    }

    pub fn remaining(&self) -> usize {
        self.stars.iter().filter(|s| s.sprite.visible).count()
    }
}
