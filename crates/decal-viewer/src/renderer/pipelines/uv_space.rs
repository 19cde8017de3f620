//! Pipelines that rasterize the mesh unfolded into the albedo canvas.

use super::{mesh_vertex_layout, sampler_entry, texture_entry, uniform_entry};

/// Must match `DecalUniforms` in `uv_space.wgsl` and `depth.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DecalUniforms {
    pub light_view_proj: [[f32; 4]; 4], // 64 B
    pub base_color: [f32; 4],           // +16
    /// x = occlusion depth bias.
    pub params: [f32; 4],               // +16 -> 96
}

const _: [(); 96] = [(); core::mem::size_of::<DecalUniforms>()];

/// Straight-alpha source-over on color and alpha alike.
const STAMP_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct UvSpacePipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub decal_layout: wgpu::BindGroupLayout,
    init: wgpu::RenderPipeline,
    init_conservative: Option<wgpu::RenderPipeline>,
    stamp: wgpu::RenderPipeline,
    stamp_conservative: Option<wgpu::RenderPipeline>,
}

impl UvSpacePipelines {
    pub fn new(
        device: &wgpu::Device,
        canvas_fmt: wgpu::TextureFormat,
        conservative_supported: bool,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Decal UBO Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                std::mem::size_of::<DecalUniforms>(),
            )],
        });

        let decal_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Decal Texture Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureSampleType::Float { filterable: true }),
                sampler_entry(1),
                texture_entry(2, wgpu::TextureSampleType::Depth),
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("uv_space.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/uv_space.wgsl").into()),
        });

        let init_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("UV Init PipelineLayout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let stamp_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("UV Stamp PipelineLayout"),
            bind_group_layouts: &[&uniform_layout, &decal_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str,
                     layout: &wgpu::PipelineLayout,
                     fs: &str,
                     blend: Option<wgpu::BlendState>,
                     conservative: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[mesh_vertex_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: fs,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: canvas_fmt,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                // Unfolding can flip winding, so nothing is culled.
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    conservative,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        };

        let init = build("UV Init Pipeline", &init_layout, "fs_init", None, false);
        let stamp = build("UV Stamp Pipeline", &stamp_layout, "fs_stamp", Some(STAMP_BLEND), false);
        let (init_conservative, stamp_conservative) = if conservative_supported {
            (
                Some(build("UV Init Pipeline (conservative)", &init_layout, "fs_init", None, true)),
                Some(build(
                    "UV Stamp Pipeline (conservative)",
                    &stamp_layout,
                    "fs_stamp",
                    Some(STAMP_BLEND),
                    true,
                )),
            )
        } else {
            (None, None)
        };

        Self {
            uniform_layout,
            decal_layout,
            init,
            init_conservative,
            stamp,
            stamp_conservative,
        }
    }

    /// Falls back to standard coverage when the conservative variant was
    /// never built.
    pub fn init(&self, conservative: bool) -> &wgpu::RenderPipeline {
        match (&self.init_conservative, conservative) {
            (Some(p), true) => p,
            _ => &self.init,
        }
    }

    pub fn stamp(&self, conservative: bool) -> &wgpu::RenderPipeline {
        match (&self.stamp_conservative, conservative) {
            (Some(p), true) => p,
            _ => &self.stamp,
        }
    }
}
