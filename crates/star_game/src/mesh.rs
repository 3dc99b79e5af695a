//! CPU-side sprite mesh rebuilt every frame and streamed into the GPU
//! buffers.

use crate::arcade::World;
use crate::assets::AssetCatalog;
use crate::scene::SceneState;
use glam::Vec2;
use star_render::vertex::quad_indices;
use star_render::SpriteVertex;
use std::sync::Arc;

/// 1x1 white texture used for untextured geometry (body outlines).
pub const WHITE_TEXTURE: &str = "__white";

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const DYNAMIC_BODY_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];
const STATIC_BODY_COLOR: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const OUTLINE_WIDTH: f32 = 1.0;

/// A contiguous run of indices that share the same texture binding.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

pub struct QuadSpec<'a> {
    pub texture_key: &'a str,
    pub center: Vec2,
    pub size: Vec2,
    /// `[u0, v0, u1, v1]`, v0 at the top edge.
    pub uv: [f32; 4],
    pub color: [f32; 4],
}

#[derive(Debug, Default)]
pub struct SpriteMesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl SpriteMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn add_quad(&mut self, spec: QuadSpec<'_>) {
        let half = spec.size * 0.5;
        let min = spec.center - half;
        let max = spec.center + half;
        let [u0, v0, u1, v1] = spec.uv;
        let base_index = self.vertices.len() as u32;

        // World y grows downward, so the top edge is `min.y`.
        for (position, tex_coords) in [
            ([min.x, min.y], [u0, v0]),
            ([max.x, min.y], [u1, v0]),
            ([max.x, max.y], [u1, v1]),
            ([min.x, max.y], [u0, v1]),
        ] {
            self.vertices.push(SpriteVertex {
                position,
                tex_coords,
                color: spec.color,
            });
        }

        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&quad_indices(base_index));
        self.push_draw_call(Arc::from(spec.texture_key), draw_start, 6);
    }

    /// Append a draw call, merging with the previous one when the texture
    /// matches and the indices are contiguous.
    fn push_draw_call(&mut self, texture_key: Arc<str>, index_start: u32, index_count: u32) {
        if let Some(last) = self.draw_calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if *last.texture_key == *texture_key && contiguous {
                last.index_count += index_count;
                return;
            }
        }
        self.draw_calls.push(DrawCall {
            texture_key,
            index_start,
            index_count,
        });
    }

    /// Four thin quads along the edges of the box at `min`..`min + size`.
    pub fn add_outline(&mut self, min: Vec2, size: Vec2, color: [f32; 4]) {
        let w = OUTLINE_WIDTH;
        let edges = [
            (Vec2::new(min.x + size.x * 0.5, min.y + w * 0.5), Vec2::new(size.x, w)),
            (
                Vec2::new(min.x + size.x * 0.5, min.y + size.y - w * 0.5),
                Vec2::new(size.x, w),
            ),
            (Vec2::new(min.x + w * 0.5, min.y + size.y * 0.5), Vec2::new(w, size.y)),
            (
                Vec2::new(min.x + size.x - w * 0.5, min.y + size.y * 0.5),
                Vec2::new(w, size.y),
            ),
        ];
        for (center, edge_size) in edges {
            self.add_quad(QuadSpec {
                texture_key: WHITE_TEXTURE,
                center,
                size: edge_size,
                uv: [0.0, 0.0, 1.0, 1.0],
                color,
            });
        }
    }

    pub fn count_texture_binds(&self) -> usize {
        let mut binds = 0usize;
        let mut current: Option<&str> = None;
        for draw in &self.draw_calls {
            let key: &str = &draw.texture_key;
            if current != Some(key) {
                current = Some(key);
                binds += 1;
            }
        }
        binds
    }
}

/// Scene sprites in draw order, then body outlines when `physics_debug` is on.
pub fn build_scene_mesh(scene: &SceneState, catalog: &AssetCatalog, physics_debug: bool) -> SpriteMesh {
    let mut mesh = SpriteMesh::new();
    for sprite in scene.sprites() {
        let Some(uv) = catalog.uv(sprite.texture, sprite.frame) else {
            log::warn!(
                "Sprite texture '{}' frame {:?} is not in the catalog",
                sprite.texture,
                sprite.frame
            );
            continue;
        };
        mesh.add_quad(QuadSpec {
            texture_key: sprite.texture,
            center: sprite.position,
            size: sprite.display_size(),
            uv,
            color: WHITE,
        });
    }

    if physics_debug {
        add_body_outlines(&mut mesh, &scene.world);
    }
    mesh
}

fn add_body_outlines(mesh: &mut SpriteMesh, world: &World) {
    for (_, body) in world.bodies().filter(|(_, b)| b.enabled) {
        let color = if body.is_static() {
            STATIC_BODY_COLOR
        } else {
            DYNAMIC_BODY_COLOR
        };
        mesh.add_outline(body.position, body.size, color);
    }
}
