//! The main rendering orchestrator. Owns the GPU context, the depth target
//! and the per-frame pipelines; the decal passes live in [`gpu_backend`].

pub mod context;
pub mod gpu_backend;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    gpu_backend::GpuDecalBackend,
    pipelines::{
        canvas_view::CanvasViewPipeline, debug_lines::DebugLinesPipeline,
        lit_scene::{LitScenePipeline, SceneGlobals},
    },
    targets::Targets,
};
use std::sync::Arc;
use texspace_decals::GlobalFrameUniforms;
use winit::window::Window;

/// What the overlay pass should show this frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayFlags {
    pub canvas: bool,
    pub lines: bool,
}

pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    pub globals: SceneGlobals,
    pub lit: LitScenePipeline,
    pub canvas_view: CanvasViewPipeline,
    pub debug_lines: DebugLinesPipeline,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let size = gfx.size;
        let color_fmt = gfx.config.format;

        let targets = Targets::new(&gfx.device, size);
        let globals = SceneGlobals::new(&gfx.device);
        let lit = LitScenePipeline::new(&gfx.device, color_fmt, targets.depth_fmt, &globals);
        let canvas_view = CanvasViewPipeline::new(&gfx.device, color_fmt);
        let debug_lines = DebugLinesPipeline::new(&gfx.device, color_fmt, &globals);

        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, color_fmt, None, 1);

        Ok(Self {
            gfx,
            targets,
            globals,
            lit,
            canvas_view,
            debug_lines,
            egui_renderer,
        })
    }

    /// Binds the decal canvas as the scene albedo and the preview source.
    pub fn attach_canvas(&mut self, backend: &GpuDecalBackend) {
        self.lit.bind_canvas(&self.gfx.device, backend.canvas_view());
        self.canvas_view.bind_canvas(&self.gfx.device, backend.canvas_view());
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    pub fn render(
        &mut self,
        swap_view: &wgpu::TextureView,
        backend: &GpuDecalBackend,
        globals: &GlobalFrameUniforms,
        overlay: OverlayFlags,
    ) {
        self.globals.write(&self.gfx.queue, globals);
        if overlay.lines {
            self.debug_lines.upload(&self.gfx.device, &self.gfx.queue);
        }

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Pass 1: lit mesh
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Lit Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.lit.draw(&mut pass, &self.globals, backend.mesh_buffers());
        }

        // Pass 2: overlays, drawn over everything
        if overlay.canvas || overlay.lines {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
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

            if overlay.lines {
                self.debug_lines.draw(&mut pass, &self.globals);
            }
            // Last: it narrows the viewport.
            if overlay.canvas {
                self.canvas_view
                    .draw(&mut pass, self.gfx.config.width, self.gfx.config.height);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
