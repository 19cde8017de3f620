use crate::{
    assets,
    camera::{Camera, CameraController},
    config::Config,
    renderer::{gpu_backend::GpuDecalBackend, OverlayFlags, Renderer},
    ui::{self, PanelView},
};
use anyhow::{Context as _, Result};
use glam::Vec3;
use std::{sync::Arc, time::Instant};
use texspace_decals::{gizmo, DecalImage, DecalSystem, RandomParams};
use winit::{
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

const START_POSITION: Vec3 = Vec3::new(150.0, 20.0, 0.0);
const HIT_SPHERE_RADIUS: f32 = 2.0;
const HIT_SPHERE_SEGMENTS: u32 = 24;
const HIT_COLOR: Vec3 = Vec3::new(1.0, 0.0, 0.0);
const FRUSTUM_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Largest power of two not above `n`.
fn floor_pow2(n: u32) -> u32 {
    if n == 0 {
        0
    } else {
        1 << (31 - n.leading_zeros())
    }
}

pub struct App {
    // Declared first so the decal textures are released before the device.
    pub decals: DecalSystem<GpuDecalBackend>,
    pub renderer: Renderer,
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub decal_names: Vec<String>,
    pub show_panel: bool,
    last_frame: Instant,
}

impl App {
    pub async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let mut renderer = Renderer::new(window.clone()).await?;
        let size = renderer.gfx.size;

        let mesh = assets::load_mesh(&config.mesh)
            .with_context(|| format!("loading mesh '{}'", config.mesh.display()))?;
        let mesh = Arc::new(mesh);

        let (decal_names, images): (Vec<String>, Vec<DecalImage>) =
            assets::load_catalog(&config.decals, &config.decal_dir)?
                .into_iter()
                .unzip();

        let mut decal_config = config.decal_config();
        let max_size = floor_pow2(renderer.gfx.max_texture_size());
        if decal_config.canvas_size > max_size {
            log::warn!(
                "Canvas size {} exceeds the device limit; using {}",
                decal_config.canvas_size,
                max_size
            );
            decal_config.canvas_size = max_size;
        }

        let backend = GpuDecalBackend::new(
            renderer.gfx.device.clone(),
            renderer.gfx.queue.clone(),
            renderer.gfx.conservative_supported,
            &mesh,
            &images,
            &decal_config,
        )?;

        let generator = match config.seed {
            Some(seed) => RandomParams::seeded(seed),
            None => RandomParams::from_entropy(),
        };
        let decals = DecalSystem::new(mesh.clone(), backend, decal_config)?
            .with_generator(Box::new(generator));

        renderer.attach_canvas(decals.backend());

        let (lo, hi) = mesh.bounds();
        log::info!(
            "Mesh bounds ({:.1}, {:.1}, {:.1}) .. ({:.1}, {:.1}, {:.1})",
            lo.x, lo.y, lo.z, hi.x, hi.y, hi.z
        );
        let camera = Camera::new(
            START_POSITION,
            -Vec3::X,
            size.width as f32 / size.height.max(1) as f32,
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            decals,
            renderer,
            camera,
            camera_controller: CameraController::new(),
            egui_ctx,
            egui_state,
            decal_names,
            show_panel: true,
            last_frame: Instant::now(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.camera
                .set_aspect(new_size.width as f32 / new_size.height as f32);
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyG) =>
            {
                self.show_panel = !self.show_panel;
                return true;
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                self.pick_at_cursor();
                return true;
            }
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            _ => {}
        }

        self.camera_controller.handle_event(event, &mut self.camera)
    }

    fn pick_at_cursor(&mut self) {
        let Some((x, y)) = self.camera_controller.last_mouse() else {
            return;
        };
        let size = self.renderer.gfx.size;
        let hit = self.decals.pick_screen(
            x as f32,
            y as f32,
            size.width as f32,
            size.height as f32,
            self.camera.view(),
            self.camera.proj,
        );
        if hit.is_hit() {
            log::debug!(
                "Picked ({:.2}, {:.2}, {:.2}) at distance {:.2}",
                hit.position.x,
                hit.position.y,
                hit.position.z,
                hit.distance
            );
        }
    }

    /// Moves the camera and runs any pending decal cycle.
    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.camera_controller.update(&mut self.camera, dt);

        if let Err(e) = self.decals.update() {
            log::error!("Decal apply failed: {}", e);
        }
    }

    fn queue_debug_lines(&mut self) -> bool {
        let settings = *self.decals.settings();
        let lines = &mut self.renderer.debug_lines;
        lines.clear();

        let hit = self.decals.last_hit();
        if !hit.is_hit() {
            return false;
        }
        if settings.visualize_hit_point {
            lines.push_segments(
                &gizmo::wire_sphere(hit.position, HIT_SPHERE_RADIUS, HIT_SPHERE_SEGMENTS),
                HIT_COLOR,
            );
        }
        if settings.visualize_projector_frustum {
            if let Some(projector) = self.decals.projector() {
                lines.push_segments(
                    &gizmo::frustum_lines(&projector.frustum_corners()),
                    FRUSTUM_COLOR,
                );
            }
        }
        !lines.is_empty()
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let overlay = OverlayFlags {
            lines: self.queue_debug_lines(),
            canvas: self.decals.settings().visualize_canvas,
        };
        let globals = self
            .decals
            .frame_uniforms(self.camera.view_proj(), self.camera.position);
        self.renderer
            .render(&swap_view, self.decals.backend(), &globals, overlay);

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        if self.show_panel {
            let mut params = *self.decals.params();
            let mut settings = *self.decals.settings();
            let actions = ui::draw_panel(
                &self.egui_ctx,
                &mut params,
                &mut settings,
                &PanelView {
                    decal_names: &self.decal_names,
                    last_hit: self.decals.last_hit(),
                    conservative_note: self.decals.conservative_note(),
                },
            );

            *self.decals.settings_mut() = settings;
            if actions.params_changed {
                self.decals.set_params(params);
            }
            if actions.clear_canvas {
                if let Err(e) = self.decals.clear_canvas() {
                    log::error!("Clear failed: {}", e);
                }
            }
        }

        let egui_output = self.egui_ctx.end_frame();
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::floor_pow2;

    #[test]
    fn floor_pow2_rounds_down() {
        assert_eq!(floor_pow2(0), 0);
        assert_eq!(floor_pow2(1), 1);
        assert_eq!(floor_pow2(8192), 8192);
        assert_eq!(floor_pow2(16383), 8192);
    }
}
