//! egui overlay drawn on top of the sprite pass: HUD text that belongs to the
//! scene (the score) plus an F3 debug window.
//!
//! egui requires a split render because `egui_wgpu::Renderer::render()` needs a
//! `RenderPass<'static>`, while `begin_render_pass` borrows the encoder:
//!
//!   1. `prepare()` -- run UI logic, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers
//!   3. `paint()`   -- render into a pass created with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! HUD text is painted every frame; the debug window only when `visible`.

use star_core::time::TimeState;
use winit::window::Window;

/// A line of scene text anchored at its top-left corner, in surface pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct HudText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size_px: f32,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub sprite_count: u32,
    /// Enabled physics bodies, static ones included
    pub active_bodies: u32,
    pub score: u32,
    /// `None` when the scene has no stars
    pub stars_remaining: Option<u32>,
    pub variant_label: String,
    pub player_grounded: bool,
    pub player_velocity: (f32, f32),
    pub physics_debug: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    pub toggle_pause: bool,
    /// Advance one fixed step while paused
    pub single_step: bool,
    pub toggle_physics_debug: bool,
    pub restart_scene: bool,
}

pub struct Overlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl Overlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug window: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        hud: &[HudText],
        stats: &OverlayStats,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            paint_hud(ctx, hud);
            if visible {
                debug_window(ctx, time, stats, &mut actions);
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn paint_hud(ctx: &egui::Context, hud: &[HudText]) {
    if hud.is_empty() {
        return;
    }
    // HUD coordinates arrive in physical pixels; egui paints in points.
    let ppp = ctx.pixels_per_point();
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("scene_hud"),
    ));
    for line in hud {
        let [r, g, b, a] = line.color;
        painter.text(
            egui::pos2(line.x / ppp, line.y / ppp),
            egui::Align2::LEFT_TOP,
            &line.text,
            egui::FontId::proportional(line.size_px / ppp),
            egui::Color32::from_rgba_unmultiplied(r, g, b, a),
        );
    }
}

fn debug_window(
    ctx: &egui::Context,
    time: &TimeState,
    stats: &OverlayStats,
    actions: &mut OverlayActions,
) {
    egui::Window::new("Debug")
        .default_pos([560.0, 10.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {:.1}", time.smoothed_fps));
            ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
            ui.label(format!("Steps this frame: {}", time.steps_this_frame));
            ui.label(format!("Total steps: {}", time.fixed_step_count));

            ui.separator();
            ui.label(format!("Draw calls: {}", stats.draw_calls));
            ui.label(format!("Texture binds: {}", stats.texture_binds));
            ui.label(format!("Sprites: {}", stats.sprite_count));
            ui.label(format!("Active bodies: {}", stats.active_bodies));

            ui.separator();
            ui.label(format!("Scene: {}", stats.variant_label));
            ui.label(format!("Score: {}", stats.score));
            if let Some(remaining) = stats.stars_remaining {
                ui.label(format!("Stars left: {remaining}"));
            }
            ui.label(format!(
                "Player v: ({:.0}, {:.0}) {}",
                stats.player_velocity.0,
                stats.player_velocity.1,
                if stats.player_grounded { "grounded" } else { "airborne" }
            ));

            ui.separator();
            ui.horizontal(|ui| {
                let pause_label = if stats.paused { "Resume" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    actions.toggle_pause = true;
                }
                if stats.paused && ui.button("Step").clicked() {
                    actions.single_step = true;
                }
                if ui.button("Restart").clicked() {
                    actions.restart_scene = true;
                }
            });
            let mut physics_debug = stats.physics_debug;
            if ui.checkbox(&mut physics_debug, "Body outlines").changed() {
                actions.toggle_physics_debug = true;
            }
            if stats.paused {
                ui.label("\u{23f8} PAUSED");
            }
        });
}
