//! starcatch -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. All simulation runs
//! inside `RedrawRequested` using a fixed timestep (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. Read hotkey edges once, then `while should_step()` runs one scene
//!      tick per slice
//!   3. Rebuild the sprite mesh from the scene (+ body outlines)
//!   4. Upload camera uniform, issue draw calls, composite the egui overlay
//!
//! Start-up runs the scene lifecycle once: preload (decode every asset),
//! create (build the world), then the update loop above. The config file is
//! watched via mtime polling; an edit reloads it at a frame boundary and runs
//! preload and create again.

mod arcade;
mod assets;
mod collectibles;
mod controller;
mod mesh;
#[cfg(test)]
mod replay;
mod scene;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use assets::{preload, AssetCatalog};
use mesh::{build_scene_mesh, DrawCall, WHITE_TEXTURE};
use scene::SceneState;
use star_core::config::{load_config_from_path, load_config_or_default, FileWatcher, GameConfig};
use star_core::input::{CursorKeys, InputState, Key};
use star_core::time::TimeState;
use star_overlay::{HudText, Overlay, OverlayStats};
use star_platform::window::PlatformConfig;
use star_render::{Camera2D, GpuContext, SpritePipeline, SpriteVertex, Texture};

const CONFIG_PATH: &str = "assets/config/game.json";
const ASSET_ROOT: &str = "assets";

struct GpuSpriteTexture {
    #[allow(dead_code)]
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    overlay: Overlay,

    config: GameConfig,
    config_watcher: FileWatcher,
    catalog: AssetCatalog,
    scene: SceneState,
    rng: StdRng,
    physics_debug: bool,
    paused: bool,
    single_step_requested: bool,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,

    // Rebuilt on the CPU each frame, then streamed into these buffers.
    // Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    texture_binds: usize,
    sprite_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>, config: GameConfig, config_path: PathBuf) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let time = TimeState::with_rate(config.fps);
        let input = InputState::new();
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let overlay = Overlay::new(&gpu.device, gpu.surface_format, &window);
        let camera = Camera2D::for_canvas(config.width, config.height);

        let catalog = preload().load(Path::new(ASSET_ROOT))?;
        let mut rng = StdRng::from_entropy();
        let scene = SceneState::create(&config, &catalog, &mut rng)?;
        let textures = upload_catalog(&gpu.device, &gpu.queue, &sprite_pipeline, &catalog);

        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let mut state = Self {
            window,
            gpu,
            time,
            input,
            camera,
            sprite_pipeline,
            overlay,
            physics_debug: config.debug,
            config,
            config_watcher: FileWatcher::new(config_path),
            catalog,
            scene,
            rng,
            paused: false,
            single_step_requested: false,
            textures,
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            texture_binds: 0,
            sprite_count: 0,
        };
        state.rebuild_scene_mesh();
        Ok(state)
    }

    fn restart_scene(&mut self, reason: &str) {
        match SceneState::create(&self.config, &self.catalog, &mut self.rng) {
            Ok(scene) => {
                self.scene = scene;
                log::info!("Scene restarted ({reason})");
            }
            Err(err) => {
                log::error!("Scene restart failed ({reason}), keeping current scene: {err}");
            }
        }
    }

    /// Re-read the config, then preload and create again. Any failure keeps
    /// the running scene.
    fn reload_config(&mut self, reason: &str) {
        let config = match load_config_from_path(self.config_watcher.path()) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Config reload failed ({reason}), keeping current scene: {err}");
                return;
            }
        };
        let catalog = match preload().load(Path::new(ASSET_ROOT)) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::error!("Preload failed ({reason}), keeping current scene: {err}");
                return;
            }
        };
        let scene = match SceneState::create(&config, &catalog, &mut self.rng) {
            Ok(scene) => scene,
            Err(err) => {
                log::error!("Scene create failed ({reason}), keeping current scene: {err}");
                return;
            }
        };

        if config.fps != self.config.fps {
            self.time = TimeState::with_rate(config.fps);
        }
        self.camera = Camera2D::for_canvas(config.width, config.height);
        self.textures = upload_catalog(
            &self.gpu.device,
            &self.gpu.queue,
            &self.sprite_pipeline,
            &catalog,
        );
        self.physics_debug = config.debug;
        self.catalog = catalog;
        self.scene = scene;
        log::info!(
            "Config reloaded ({reason}): variant {:?}, gravity {}, {}x{}",
            config.variant,
            config.gravity_y,
            config.width,
            config.height
        );
        self.config = config;
    }

    fn toggle_physics_debug(&mut self) {
        self.physics_debug = !self.physics_debug;
        log::info!(
            "Physics debug: {}",
            if self.physics_debug { "ON" } else { "OFF" }
        );
    }

    fn rebuild_scene_mesh(&mut self) {
        let mesh = build_scene_mesh(&self.scene, &self.catalog, self.physics_debug);
        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        self.sprite_count = mesh.quad_count();
        self.texture_binds = mesh.count_texture_binds();

        if !mesh.vertices.is_empty() {
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&mesh.vertices),
            );
        }
        if !mesh.indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.draw_calls = mesh.draw_calls;
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    /// Scene labels mapped from canvas to surface pixels.
    fn hud_text(&self) -> Vec<HudText> {
        let surface = self.gpu.size;
        let scale = self.camera.surface_scale(surface);
        self.scene
            .labels()
            .into_iter()
            .map(|label| {
                let at = self.camera.world_to_surface(label.position, surface);
                HudText {
                    text: label.text.clone(),
                    x: at.x,
                    y: at.y,
                    size_px: label.size_px * scale.y,
                    color: label.color,
                }
            })
            .collect()
    }

    fn overlay_stats(&self) -> OverlayStats {
        let player = self.scene.world.body(self.scene.player_body);
        OverlayStats {
            draw_calls: self.draw_calls.len() as u32,
            texture_binds: self.texture_binds as u32,
            sprite_count: self.sprite_count as u32,
            active_bodies: self.scene.world.active_body_count() as u32,
            score: self.scene.score(),
            stars_remaining: self
                .scene
                .collectibles
                .as_ref()
                .map(|c| c.remaining() as u32),
            variant_label: format!("{:?}", self.scene.variant),
            player_grounded: self.scene.player_grounded(),
            player_velocity: (player.velocity.x, player.velocity.y),
            physics_debug: self.physics_debug,
            paused: self.paused,
        }
    }
}

struct App {
    config: GameConfig,
    config_path: PathBuf,
    state: Option<EngineState>,
}

impl App {
    fn new(config: GameConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let platform_config = PlatformConfig {
            title: self.config.title.clone(),
            width: self.config.width,
            height: self.config.height,
        };
        let window = match star_platform::window::create_window(event_loop, &platform_config) {
            Ok(window) => window,
            Err(err) => {
                log::error!("{err}");
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            platform_config.width,
            platform_config.height
        );
        match EngineState::new(window, self.config.clone(), self.config_path.clone()) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Start-up failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();

                // Frame boundary: safe point for reloads.
                if state.config_watcher.should_reload() {
                    state.reload_config("file watcher");
                }

                let dt = state.time.fixed_dt as f32;
                let dt_us = state.time.fixed_dt_us();
                let hotkeys = FrameHotkeys::poll(&state.input);
                if hotkeys.exit {
                    log::info!("Escape pressed, exiting.");
                    event_loop.exit();
                    return;
                }
                if hotkeys.toggle_overlay {
                    state.overlay.toggle();
                }
                if hotkeys.toggle_physics_debug {
                    state.toggle_physics_debug();
                }
                if hotkeys.restart {
                    state.restart_scene("manual trigger (R)");
                }

                while state.time.should_step() {
                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    let cursors = CursorKeys::poll(&state.input);
                    state.scene.step(cursors, dt, dt_us);
                }
                state.time.end_frame();

                state.rebuild_scene_mesh();

                let camera_uniform = state.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };

                let hud = state.hud_text();
                let stats = state.overlay_stats();
                let (egui_primitives, egui_textures_delta, overlay_actions) =
                    state
                        .overlay
                        .prepare(&state.window, &state.time, &hud, &stats);

                if overlay_actions.toggle_pause {
                    state.paused = !state.paused;
                    log::info!(
                        "Simulation {}",
                        if state.paused { "PAUSED" } else { "RESUMED" }
                    );
                }
                if overlay_actions.single_step {
                    state.single_step_requested = true;
                }
                if overlay_actions.toggle_physics_debug {
                    state.toggle_physics_debug();
                }
                if overlay_actions.restart_scene {
                    state.restart_scene("debug window");
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                {
                    let mut last_bound_texture_key: Option<&Arc<str>> = None;
                    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Scene Render Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });

                    render_pass.set_pipeline(&state.sprite_pipeline.render_pipeline);
                    render_pass.set_bind_group(0, &state.camera_bind_group, &[]);
                    render_pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                    for draw in &state.draw_calls {
                        if let Some(texture) = state.textures.get(&draw.texture_key) {
                            let need_rebind = match last_bound_texture_key {
                                Some(last) => **last != *draw.texture_key,
                                None => true,
                            };
                            if need_rebind {
                                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                                last_bound_texture_key = Some(&draw.texture_key);
                            }
                            render_pass.draw_indexed(
                                draw.index_start..(draw.index_start + draw.index_count),
                                0,
                                0..1,
                            );
                        }
                    }
                }

                state.overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                // Only clear edge-triggered input after at least one fixed
                // step consumed it.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Upload every decoded asset plus the white texture used for outlines.
fn upload_catalog(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &SpritePipeline,
    catalog: &AssetCatalog,
) -> HashMap<Arc<str>, GpuSpriteTexture> {
    let mut textures = HashMap::new();
    for (key, asset) in catalog.iter() {
        let texture = Texture::from_image(device, queue, &asset.image, key);
        let bind_group = pipeline.create_texture_bind_group(device, &texture);
        textures.insert(Arc::from(key), GpuSpriteTexture { texture, bind_group });
    }

    let white = Texture::from_rgba8(device, queue, &[255, 255, 255, 255], 1, 1, WHITE_TEXTURE);
    let bind_group = pipeline.create_texture_bind_group(device, &white);
    textures.insert(
        Arc::from(WHITE_TEXTURE),
        GpuSpriteTexture {
            texture: white,
            bind_group,
        },
    );
    log::info!("Uploaded {} textures", textures.len());
    textures
}

/// Engine hotkeys pressed since the last frame. Read once per rendered
/// frame, however many fixed steps that frame runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FrameHotkeys {
    exit: bool,
    toggle_overlay: bool,
    toggle_physics_debug: bool,
    restart: bool,
}

impl FrameHotkeys {
    fn poll(input: &InputState) -> Self {
        Self {
            exit: input.is_just_pressed(Key::Escape),
            toggle_overlay: input.is_just_pressed(Key::F3),
            toggle_physics_debug: input.is_just_pressed(Key::F4),
            restart: input.is_just_pressed(Key::R),
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("starcatch starting...");

    let config_path = PathBuf::from(CONFIG_PATH);
    let config = match load_config_or_default(&config_path) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, config_path);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_map_to_cursors() {
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Key::Left));
        assert_eq!(map_key(KeyCode::ArrowDown), Some(Key::Down));
        assert_eq!(map_key(KeyCode::KeyR), Some(Key::R));
        assert_eq!(map_key(KeyCode::Space), None);
    }

    #[test]
    fn hotkeys_fire_once_per_press() {
        let mut input = InputState::new();
        input.key_down(Key::F3);
        input.key_down(Key::R);
        assert_eq!(
            FrameHotkeys::poll(&input),
            FrameHotkeys {
                toggle_overlay: true,
                restart: true,
                ..FrameHotkeys::default()
            }
        );

        // Still held on the next frame: no second toggle or restart.
        input.end_frame();
        assert_eq!(FrameHotkeys::poll(&input), FrameHotkeys::default());
    }

    #[test]
    fn arrow_keys_are_not_hotkeys() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Up);
        assert_eq!(FrameHotkeys::poll(&input), FrameHotkeys::default());
    }
}
