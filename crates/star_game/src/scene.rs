//! The platformer scene: create builds the world once per start, `step`
//! advances it by one fixed tick.
//!
//! Tick order is fixed: physics step, overlap callbacks, the update decision,
//! then the player animation. The update therefore always reads contact flags
//! produced by the physics step of the same tick.

use crate::arcade::{BodyId, Rect, StaticGroup, World};
use crate::assets::{AssetCatalog, DUDE, GROUND, SKY, STAR};
use crate::collectibles::Collectibles;
use crate::controller::{self, ANIM_LEFT, ANIM_RIGHT, ANIM_TURN};
use glam::Vec2;
use rand::Rng;
use star_core::animation::{
    generate_frame_numbers, AnimationClip, AnimationPlayer, AnimationRegistry,
};
use star_core::config::{GameConfig, SceneVariant};
use star_core::input::CursorKeys;

pub const SKY_POSITION: Vec2 = Vec2::new(400.0, 300.0);
pub const GROUND_POSITION: Vec2 = Vec2::new(400.0, 568.0);
pub const GROUND_SCALE: f32 = 2.0;
pub const LEDGE_POSITIONS: [Vec2; 3] = [
    Vec2::new(600.0, 400.0),
    Vec2::new(50.0, 250.0),
    Vec2::new(750.0, 220.0),
];
pub const PLAYER_START: Vec2 = Vec2::new(100.0, 450.0);
pub const PLAYER_BOUNCE: f32 = 0.2;

/// A textured quad placed by its centre. `size` is the unscaled frame size.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub texture: &'static str,
    pub position: Vec2,
    pub size: Vec2,
    pub scale: Vec2,
    /// Sheet frame; `None` draws the whole image.
    pub frame: Option<u32>,
    pub visible: bool,
    pub body: Option<BodyId>,
}

impl Sprite {
    pub fn new(texture: &'static str, position: Vec2, size: Vec2) -> Self {
        Self {
            texture,
            position,
            size,
            scale: Vec2::ONE,
            frame: None,
            visible: true,
            body: None,
        }
    }

    pub fn with_body(mut self, body: BodyId) -> Self {
        self.body = Some(body);
        self
    }

    pub fn display_size(&self) -> Vec2 {
        self.size * self.scale
    }

    /// Follow the attached body.
    pub fn sync_from(&mut self, world: &World) {
        if let Some(id) = self.body {
            self.position = world.body(id).center();
        }
    }
}

/// Scene text anchored at its top-left corner, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub position: Vec2,
    pub size_px: f32,
    pub color: [u8; 4],
}

pub struct SceneState {
    pub variant: SceneVariant,
    pub world: World,
    pub sky: Sprite,
    pub platform_group: StaticGroup,
    pub platforms: Vec<Sprite>,
    pub player: Sprite,
    pub player_body: BodyId,
    pub animations: AnimationRegistry,
    pub player_animation: AnimationPlayer,
    pub cursors: CursorKeys,
    pub collectibles: Option<Collectibles>,
}

impl SceneState {
    pub fn create<R: Rng>(
        config: &GameConfig,
        catalog: &AssetCatalog,
        rng: &mut R,
    ) -> Result<Self, String> {
        let mut world = World::new(
            Rect::new(0.0, 0.0, config.width as f32, config.height as f32),
            Vec2::new(0.0, config.gravity_y),
        );

        let sky = Sprite::new(SKY, SKY_POSITION, catalog.require_size(SKY)?);

        let ground_size = catalog.require_size(GROUND)?;
        let mut platform_group = StaticGroup::new();
        let mut platforms = Vec::with_capacity(1 + LEDGE_POSITIONS.len());

        let ground_id = platform_group.create(&mut world, GROUND_POSITION, ground_size);
        let mut ground = Sprite::new(GROUND, GROUND_POSITION, ground_size).with_body(ground_id);
        ground.scale = Vec2::splat(GROUND_SCALE);
        world.refresh_body(ground_id, ground.position, ground.display_size());
        platforms.push(ground);

        for position in LEDGE_POSITIONS {
            let id = platform_group.create(&mut world, position, ground_size);
            platforms.push(Sprite::new(GROUND, position, ground_size).with_body(id));
        }

        let player_size = catalog.require_size(DUDE)?;
        let player_body = world.add_dynamic(PLAYER_START, player_size);
        {
            let body = world.body_mut(player_body);
            body.bounce = Vec2::splat(PLAYER_BOUNCE);
            body.collide_world_bounds = true;
        }
        let mut player = Sprite::new(DUDE, PLAYER_START, player_size).with_body(player_body);
        player.frame = Some(0);

        let animations = build_player_animations(catalog)?;

        world.add_collider(&[player_body], platform_group.ids())?;

        let collectibles = if config.variant.has_collectibles() {
            let star_size = catalog.require_size(STAR)?;
            Some(Collectibles::spawn(
                &mut world,
                player_body,
                platform_group.ids(),
                star_size,
                rng,
            )?)
        } else {
            None
        };

        log::info!(
            "Scene created: variant {:?}, {} platforms, {} bodies",
            config.variant,
            platform_group.len(),
            world.active_body_count()
        );

        Ok(Self {
            variant: config.variant,
            world,
            sky,
            platform_group,
            platforms,
            player,
            player_body,
            animations,
            player_animation: AnimationPlayer::new(),
            cursors: CursorKeys::default(),
            collectibles,
        })
    }

    /// One fixed tick.
    pub fn step(&mut self, cursors: CursorKeys, dt: f32, dt_us: u64) {
        self.cursors = cursors;

        let events = self.world.step(dt);
        if let Some(collectibles) = self.collectibles.as_mut() {
            for event in &events {
                collectibles.handle_overlap(&mut self.world, event);
            }
        }

        self.update();

        if let Some(frame) = self.player_animation.tick(dt_us, &self.animations) {
            self.player.frame = Some(frame);
        }

        self.player.sync_from(&self.world);
        if let Some(collectibles) = self.collectibles.as_mut() {
            for star in collectibles.stars.iter_mut().filter(|s| s.sprite.visible) {
                star.sprite.sync_from(&self.world);
            }
        }
    }

    /// Per-frame player control from the current cursor snapshot.
    pub fn update(&mut self) {
        let grounded = self.world.body(self.player_body).touching.down;
        let decision = controller::decide(self.cursors, grounded);
        controller::apply(
            &decision,
            self.world.body_mut(self.player_body),
            &mut self.player_animation,
        );
    }

    pub fn player_grounded(&self) -> bool {
        self.world.body(self.player_body).touching.down
    }

    pub fn score(&self) -> u32 {
        self.collectibles.as_ref().map_or(0, |c| c.score.score())
    }

    /// Visible sprites, back to front.
    pub fn sprites(&self) -> Vec<&Sprite> {
        let mut out = Vec::with_capacity(2 + self.platforms.len());
        out.push(&self.sky);
        out.extend(self.platforms.iter());
        out.push(&self.player);
        if let Some(collectibles) = &self.collectibles {
            out.extend(collectibles.stars.iter().map(|s| &s.sprite));
        }
        out.retain(|s| s.visible);
        out
    }

    pub fn labels(&self) -> Vec<&TextLabel> {
        self.collectibles
            .iter()
            .map(|c| &c.score.label)
            .collect()
    }
}

fn build_player_animations(catalog: &AssetCatalog) -> Result<AnimationRegistry, String> {
    let mut animations = AnimationRegistry::new();
    animations.create(
        ANIM_LEFT,
        AnimationClip {
            frames: generate_frame_numbers(0, 3),
            frame_rate: 10,
            repeat: AnimationClip::REPEAT_FOREVER,
        },
    )?;
    animations.create(
        ANIM_TURN,
        AnimationClip {
            frames: vec![4],
            frame_rate: 20,
            repeat: 0,
        },
    )?;
    animations.create(
        ANIM_RIGHT,
        AnimationClip {
            frames: generate_frame_numbers(5, 8),
            frame_rate: 10,
            repeat: AnimationClip::REPEAT_FOREVER,
        },
    )?;

    let sheet = catalog
        .sheet(DUDE)
        .ok_or_else(|| format!("Asset '{DUDE}' is not a sprite sheet"))?;
    animations.validate_frames(sheet.frame_count())?;
    Ok(animations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{tutorial_catalog, AssetCatalog};
    use image::RgbaImage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;
    const DT_US: u64 = 16_667;

    fn scene(variant: SceneVariant) -> SceneState {
        let config = GameConfig {
            variant,
            ..GameConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        SceneState::create(&config, &tutorial_catalog(), &mut rng).expect("scene create")
    }

    fn idle() -> CursorKeys {
        CursorKeys::default()
    }

    fn run(scene: &mut SceneState, cursors: CursorKeys, steps: usize) {
        for _ in 0..steps {
            scene.step(cursors, DT, DT_US);
        }
    }

    #[test]
    fn basic_scene_has_platforms_and_player_only() {
        let scene = scene(SceneVariant::Basic);
        assert!(scene.collectibles.is_none());
        assert_eq!(scene.platforms.len(), 4);
        assert!(scene.labels().is_empty());
        // sky, four platforms, player
        assert_eq!(scene.sprites().len(), 6);
        assert_eq!(scene.score(), 0);
    }

    #[test]
    fn ground_body_matches_scaled_sprite() {
        let scene = scene(SceneVariant::Basic);
        let ground = &scene.platforms[0];
        assert_eq!(ground.display_size(), Vec2::new(800.0, 64.0));
        let body = scene.world.body(ground.body.expect("ground body"));
        assert_eq!(body.left(), 0.0);
        assert_eq!(body.top(), 536.0);
        assert_eq!(body.size, Vec2::new(800.0, 64.0));
    }

    #[test]
    fn ledges_keep_unscaled_size() {
        let scene = scene(SceneVariant::Basic);
        for (sprite, expected) in scene.platforms[1..].iter().zip(LEDGE_POSITIONS) {
            let body = scene.world.body(sprite.body.expect("ledge body"));
            assert_eq!(body.center(), expected);
            assert_eq!(body.size, Vec2::new(400.0, 32.0));
        }
    }

    #[test]
    fn player_starts_with_bounce_and_world_bounds() {
        let scene = scene(SceneVariant::Basic);
        let body = scene.world.body(scene.player_body);
        assert_eq!(body.center(), PLAYER_START);
        assert_eq!(body.bounce, Vec2::splat(0.2));
        assert!(body.collide_world_bounds);
        assert_eq!(scene.animations.len(), 3);
        assert_eq!(scene.animations.get("turn").map(|c| c.frames.clone()), Some(vec![4]));
    }

    #[test]
    fn collect_scene_adds_stars_and_score_text() {
        let scene = scene(SceneVariant::Collect);
        let collectibles = scene.collectibles.as_ref().expect("stars");
        assert_eq!(collectibles.stars.len(), 12);
        assert_eq!(collectibles.stars[0].sprite.position, Vec2::new(12.0, 0.0));
        assert_eq!(scene.labels()[0].text, "score: 0");
        assert_eq!(scene.sprites().len(), 18);
    }

    #[test]
    fn player_lands_on_ground_and_idles() {
        let mut scene = scene(SceneVariant::Basic);
        assert!(!scene.player_grounded());
        run(&mut scene, idle(), 120);
        assert!(scene.player_grounded());
        let body = scene.world.body(scene.player_body);
        assert!((body.bottom() - 536.0).abs() < 0.5, "bottom {}", body.bottom());
        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(scene.player_animation.current_key(), Some("turn"));
        assert_eq!(scene.player.frame, Some(4));
    }

    #[test]
    fn up_while_airborne_does_not_jump() {
        let mut scene = scene(SceneVariant::Basic);
        let up = CursorKeys {
            up: true,
            ..CursorKeys::default()
        };
        scene.step(up, DT, DT_US);
        assert!(scene.world.body(scene.player_body).velocity.y > 0.0);
    }

    #[test]
    fn up_while_grounded_jumps() {
        let mut scene = scene(SceneVariant::Basic);
        run(&mut scene, idle(), 120);
        let up = CursorKeys {
            up: true,
            ..CursorKeys::default()
        };
        scene.step(up, DT, DT_US);
        assert_eq!(scene.world.body(scene.player_body).velocity.y, -330.0);

        let before = scene.world.body(scene.player_body).bottom();
        run(&mut scene, up, 10);
        assert!(!scene.player_grounded());
        assert!(scene.world.body(scene.player_body).bottom() < before);
    }

    #[test]
    fn running_right_plays_walk_cycle() {
        let mut scene = scene(SceneVariant::Basic);
        run(&mut scene, idle(), 120);
        let start_x = scene.player.position.x;
        let right = CursorKeys {
            right: true,
            ..CursorKeys::default()
        };
        run(&mut scene, right, 30);
        assert_eq!(scene.player_animation.current_key(), Some("right"));
        assert!(scene.player.position.x > start_x + 70.0);
        let frame = scene.player.frame.expect("frame");
        assert!((5..=8).contains(&frame), "frame {frame}");
    }

    #[test]
    fn player_is_kept_inside_the_canvas() {
        let mut scene = scene(SceneVariant::Basic);
        let left = CursorKeys {
            left: true,
            ..CursorKeys::default()
        };
        run(&mut scene, left, 120);
        let body = scene.world.body(scene.player_body);
        assert!(body.left() >= 0.0);
    }

    #[test]
    fn touching_a_star_scores_once() {
        let mut scene = scene(SceneVariant::Collect);
        let star_body = scene.collectibles.as_ref().expect("stars").stars[2].body;
        let target = scene.world.body(star_body).center();
        let size = scene.world.body(scene.player_body).size;
        scene.world.body_mut(scene.player_body).position = target - size * 0.5;

        scene.step(idle(), DT, DT_US);
        assert_eq!(scene.score(), 10);
        assert_eq!(scene.labels()[0].text, "Score: 10");
        assert_eq!(scene.sprites().len(), 17);

        run(&mut scene, idle(), 5);
        assert_eq!(scene.score(), 10);
    }

    #[test]
    fn collecting_every_star_scores_120() {
        let mut scene = scene(SceneVariant::Collect);
        let stars: Vec<BodyId> = scene
            .collectibles
            .as_ref()
            .expect("stars")
            .stars
            .iter()
            .map(|s| s.body)
            .collect();
        for star in stars {
            let target = scene.world.body(star).center();
            let size = scene.world.body(scene.player_body).size;
            scene.world.body_mut(scene.player_body).position = target - size * 0.5;
            scene.step(idle(), DT, DT_US);
        }
        assert_eq!(scene.score(), 120);
        assert_eq!(scene.labels()[0].text, "Score: 120");
    }

    #[test]
    fn stars_come_to_rest_on_platforms() {
        let mut scene = scene(SceneVariant::Collect);
        run(&mut scene, idle(), 1800);
        let collectibles = scene.collectibles.as_ref().expect("stars");
        for star in &collectibles.stars {
            let body = scene.world.body(star.body);
            assert!(body.bottom() <= 536.0 + 0.5, "star fell through: {}", body.bottom());
            assert!(body.touching.down);
        }
    }

    #[test]
    fn missing_sheet_fails_create() {
        let mut catalog = AssetCatalog::new();
        catalog.insert_image(SKY, RgbaImage::new(8, 6)).expect("sky");
        catalog.insert_image(GROUND, RgbaImage::new(40, 4)).expect("ground");
        catalog.insert_image(STAR, RgbaImage::new(2, 2)).expect("star");
        let mut rng = StdRng::seed_from_u64(1);
        let err = SceneState::create(&GameConfig::default(), &catalog, &mut rng)
            .err()
            .expect("create should fail");
        assert!(err.contains("'dude'"), "{err}");
    }
}
