// Draws the mesh lit by a headlight, with the decal canvas as its albedo.

use super::{mesh_vertex_layout, texture_sampler_layout, uniform_entry, MeshBuffers};
use texspace_decals::GlobalFrameUniforms;

/// Per-frame camera and projector matrices, shared with the debug lines.
pub struct SceneGlobals {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
}

impl SceneGlobals {
    pub fn new(device: &wgpu::Device) -> Self {
        let size = std::mem::size_of::<GlobalFrameUniforms>();

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals UBO"),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                size,
            )],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            layout,
            bind_group,
            buffer,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, globals: &GlobalFrameUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(globals));
    }
}

pub struct LitScenePipeline {
    pipeline: wgpu::RenderPipeline,
    albedo_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    albedo_bind: Option<wgpu::BindGroup>,
}

impl LitScenePipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
        globals: &SceneGlobals,
    ) -> Self {
        let albedo_layout = texture_sampler_layout(device, "Albedo Layout");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/mesh.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Scene PipelineLayout"),
            bind_group_layouts: &[&globals.layout, &albedo_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lit Scene Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[mesh_vertex_layout()],
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
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        // Trilinear, repeating, anisotropic.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Albedo Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });

        Self {
            pipeline,
            albedo_layout,
            sampler,
            albedo_bind: None,
        }
    }

    /// Points the albedo binding at the full mip chain of the canvas.
    pub fn bind_canvas(&mut self, device: &wgpu::Device, canvas: &wgpu::TextureView) {
        self.albedo_bind = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Albedo Bind"),
            layout: &self.albedo_layout,
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

    /// Does nothing until a canvas is bound.
    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        globals: &'a SceneGlobals,
        mesh: &'a MeshBuffers,
    ) {
        let Some(albedo) = self.albedo_bind.as_ref() else {
            return;
        };
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &globals.bind_group, &[]);
        rpass.set_bind_group(1, albedo, &[]);
        mesh.draw(rpass);
    }
}
