//! Canvas camera: world units are canvas pixels, origin top-left, y down.

use glam::{Mat4, Vec2, Vec4};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

pub struct Camera2D {
    /// World point shown at the centre of the surface.
    pub position: Vec2,
    pub zoom: f32,
    /// Size of the visible canvas in world units.
    pub view_size: Vec2,
}

impl Camera2D {
    /// Camera framing a whole `width` x `height` canvas.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let view_size = Vec2::new(width as f32, height as f32);
        Self {
            position: view_size * 0.5,
            zoom: 1.0,
            view_size,
        }
    }

    pub fn projection(&self) -> Mat4 {
        let half = self.view_size / (2.0 * self.zoom);
        // bottom/top swapped so world y grows downward on screen.
        Mat4::orthographic_rh(
            self.position.x - half.x,
            self.position.x + half.x,
            self.position.y + half.y,
            self.position.y - half.y,
            -1.0,
            1.0,
        )
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.projection().to_cols_array_2d(),
        }
    }

    /// Map a world point to physical surface pixels (origin top-left).
    pub fn world_to_surface(&self, world: Vec2, surface: (u32, u32)) -> Vec2 {
        let clip = self.projection() * Vec4::new(world.x, world.y, 0.0, 1.0);
        Vec2::new(
            (clip.x + 1.0) * 0.5 * surface.0 as f32,
            (1.0 - clip.y) * 0.5 * surface.1 as f32,
        )
    }

    /// Surface pixels per world unit along each axis.
    pub fn surface_scale(&self, surface: (u32, u32)) -> Vec2 {
        Vec2::new(
            surface.0 as f32 / self.view_size.x,
            surface.1 as f32 / self.view_size.y,
        ) * self.zoom
    }
}
