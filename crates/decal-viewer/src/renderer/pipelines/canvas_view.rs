use super::{fs_tri_layout, texture_sampler_layout, FS_TRI};
use wgpu::util::DeviceExt;

/// Edge length, in pixels, of the canvas preview.
pub const PREVIEW_SIZE: f32 = 512.0;

/// Shows the albedo canvas in the lower-left corner of the frame.
pub struct CanvasViewPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fs_vbo: wgpu::Buffer,
    bind: Option<wgpu::BindGroup>,
}

impl CanvasViewPipeline {
    pub fn new(device: &wgpu::Device, color_fmt: wgpu::TextureFormat) -> Self {
        let layout = texture_sampler_layout(device, "Canvas View Layout");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("canvas_view.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/canvas_view.wgsl").into()),
        });

        let pipe_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas View PipelineLayout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Canvas View Pipeline"),
            layout: Some(&pipe_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[fs_tri_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas View Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fs_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Canvas View FS VBO"),
            contents: bytemuck::cast_slice(&FS_TRI),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            layout,
            sampler,
            fs_vbo,
            bind: None,
        }
    }

    pub fn bind_canvas(&mut self, device: &wgpu::Device, canvas: &wgpu::TextureView) {
        self.bind = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas View Bind"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
    }

    /// Restricts the viewport to the preview square; callers drawing after
    /// this must reset it.
    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame_width: u32, frame_height: u32) {
        let Some(bind) = self.bind.as_ref() else {
            return;
        };
        let size = PREVIEW_SIZE.min(frame_width as f32).min(frame_height as f32);
        rpass.set_viewport(0.0, frame_height as f32 - size, size, size, 0.0, 1.0);
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind, &[]);
        rpass.set_vertex_buffer(0, self.fs_vbo.slice(..));
        rpass.draw(0..3, 0..1);
    }
}
