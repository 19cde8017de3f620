//! [`DecalBackend`] on wgpu: the canvas, occlusion map and decal images live
//! in GPU textures and every pass is a render pass.

use super::pipelines::{
    mipmap::MipmapPipeline,
    occlusion::{OcclusionPipeline, OCCLUSION_FMT},
    uv_space::{DecalUniforms, UvSpacePipelines},
    MeshBuffers,
};
use glam::Mat4;
use std::sync::Arc;
use texspace_decals::{DecalBackend, DecalConfig, DecalError, DecalImage, Mesh, Result, StampJob};

pub const CANVAS_FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct GpuDecal {
    width: u32,
    height: u32,
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct GpuDecalBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    conservative_supported: bool,

    canvas: wgpu::Texture,
    canvas_view: wgpu::TextureView,
    canvas_target: wgpu::TextureView,
    canvas_levels: u32,
    clear_color: wgpu::Color,

    _occlusion: wgpu::Texture,
    occlusion_view: wgpu::TextureView,

    uniforms: DecalUniforms,
    uniform_buffer: wgpu::Buffer,
    uniform_bind: wgpu::BindGroup,

    decals: Vec<GpuDecal>,
    mesh: MeshBuffers,

    uv_space: UvSpacePipelines,
    occlusion_pass: OcclusionPipeline,
    mipmap: MipmapPipeline,
}

impl GpuDecalBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        conservative_supported: bool,
        mesh: &Mesh,
        decals: &[DecalImage],
        config: &DecalConfig,
    ) -> Result<Self> {
        config.validate()?;
        if decals.is_empty() {
            return Err(DecalError::EmptyCatalog);
        }
        let max_dim = device.limits().max_texture_dimension_2d;
        if config.canvas_size > max_dim || config.occlusion_size > max_dim {
            return Err(DecalError::InvalidConfig(format!(
                "texture size exceeds the device limit of {max_dim}"
            )));
        }

        let canvas_levels = config.canvas_mip_levels();
        let canvas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Albedo Canvas"),
            size: wgpu::Extent3d {
                width: config.canvas_size,
                height: config.canvas_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: canvas_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_FMT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let canvas_view = canvas.create_view(&wgpu::TextureViewDescriptor::default());
        let canvas_target = canvas.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Albedo Canvas Level 0"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });

        let occlusion = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Occlusion Map"),
            size: wgpu::Extent3d {
                width: config.occlusion_size,
                height: config.occlusion_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OCCLUSION_FMT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let occlusion_view = occlusion.create_view(&wgpu::TextureViewDescriptor::default());

        let uv_space = UvSpacePipelines::new(&device, CANVAS_FMT, conservative_supported);
        let occlusion_pass = OcclusionPipeline::new(&device, &uv_space.uniform_layout);
        let mipmap = MipmapPipeline::new(&device, CANVAS_FMT);

        let uniforms = DecalUniforms {
            light_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            base_color: config.base_color_f32(),
            params: [config.depth_bias, 0.0, 0.0, 0.0],
        };
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Decal UBO"),
            size: std::mem::size_of::<DecalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Decal UBO Bind"),
            layout: &uv_space.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let decal_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Decal Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let decals = decals
            .iter()
            .map(|image| {
                upload_decal(
                    &device,
                    &queue,
                    &uv_space.decal_layout,
                    &decal_sampler,
                    &occlusion_view,
                    image,
                )
            })
            .collect();

        let c = config.clear_color;
        let clear_color = wgpu::Color {
            r: c[0] as f64 / 255.0,
            g: c[1] as f64 / 255.0,
            b: c[2] as f64 / 255.0,
            a: c[3] as f64 / 255.0,
        };

        let mesh = MeshBuffers::new(&device, mesh);

        log::info!(
            "GPU decal backend: {}x{} canvas with {} mips, {}x{} occlusion map",
            config.canvas_size,
            config.canvas_size,
            canvas_levels,
            config.occlusion_size,
            config.occlusion_size
        );

        Ok(Self {
            device,
            queue,
            conservative_supported,
            canvas,
            canvas_view,
            canvas_target,
            canvas_levels,
            clear_color,
            _occlusion: occlusion,
            occlusion_view,
            uniforms,
            uniform_buffer,
            uniform_bind,
            decals,
            mesh,
            uv_space,
            occlusion_pass,
            mipmap,
        })
    }

    /// The canvas with its whole mip chain, for sampling.
    pub fn canvas_view(&self) -> &wgpu::TextureView {
        &self.canvas_view
    }

    pub fn mesh_buffers(&self) -> &MeshBuffers {
        &self.mesh
    }

    fn write_uniforms(&self) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn canvas_pass<'a>(
        &'a self,
        encoder: &'a mut wgpu::CommandEncoder,
        label: &str,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.canvas_target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

fn upload_decal(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    occlusion_view: &wgpu::TextureView,
    image: &DecalImage,
) -> GpuDecal {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Decal Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_bytes(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Decal Bind"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(occlusion_view),
            },
        ],
    });

    GpuDecal {
        width: image.width(),
        height: image.height(),
        _texture: texture,
        bind_group,
    }
}

impl DecalBackend for GpuDecalBackend {
    fn supports_conservative(&self) -> bool {
        self.conservative_supported
    }

    fn decal_count(&self) -> usize {
        self.decals.len()
    }

    fn decal_extent(&self, index: usize) -> Option<(u32, u32)> {
        self.decals.get(index).map(|d| (d.width, d.height))
    }

    fn initialize_canvas(&mut self, conservative: bool) -> Result<()> {
        self.write_uniforms();

        let mut encoder = self.encoder("Canvas Init Encoder");
        {
            let mut pass = self.canvas_pass(
                &mut encoder,
                "Canvas Init Pass",
                wgpu::LoadOp::Clear(self.clear_color),
            );
            pass.set_pipeline(self.uv_space.init(conservative));
            pass.set_bind_group(0, &self.uniform_bind, &[]);
            self.mesh.draw(&mut pass);
        }
        self.submit(encoder);
        Ok(())
    }

    fn render_occlusion(&mut self, light_view_proj: Mat4) -> Result<()> {
        self.uniforms.light_view_proj = light_view_proj.to_cols_array_2d();
        self.write_uniforms();

        let mut encoder = self.encoder("Occlusion Encoder");
        self.occlusion_pass
            .draw(&mut encoder, &self.occlusion_view, &self.uniform_bind, &self.mesh);
        self.submit(encoder);
        Ok(())
    }

    fn stamp(&mut self, job: &StampJob) -> Result<()> {
        let count = self.decals.len();
        let decal = self
            .decals
            .get(job.decal_index)
            .ok_or(DecalError::DecalIndexOutOfRange {
                index: job.decal_index,
                count,
            })?;

        self.uniforms.light_view_proj = job.light_view_proj.to_cols_array_2d();
        self.uniforms.params[0] = job.depth_bias;
        self.write_uniforms();

        let mut encoder = self.encoder("Stamp Encoder");
        {
            let mut pass = self.canvas_pass(&mut encoder, "Stamp Pass", wgpu::LoadOp::Load);
            pass.set_pipeline(self.uv_space.stamp(job.conservative));
            pass.set_bind_group(0, &self.uniform_bind, &[]);
            pass.set_bind_group(1, &decal.bind_group, &[]);
            self.mesh.draw(&mut pass);
        }
        self.submit(encoder);
        Ok(())
    }

    fn generate_mips(&mut self) -> Result<()> {
        let mut encoder = self.encoder("Mipmap Encoder");
        self.mipmap
            .generate(&self.device, &mut encoder, &self.canvas, self.canvas_levels);
        self.submit(encoder);
        Ok(())
    }
}
