//! Line-list overlay for the projector frustum and the hit point.

use super::lit_scene::SceneGlobals;
use glam::Vec3;
use texspace_decals::gizmo::Segment;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

const _: [(); 24] = [(); core::mem::size_of::<LineVertex>()];

pub struct DebugLinesPipeline {
    pipeline: wgpu::RenderPipeline,
    vbo: wgpu::Buffer,
    capacity: u64,
    vertices: Vec<LineVertex>,
}

impl DebugLinesPipeline {
    const INITIAL_CAPACITY: u64 = 256;

    pub fn new(device: &wgpu::Device, color_fmt: wgpu::TextureFormat, globals: &SceneGlobals) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("debug_lines.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/debug_lines.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Debug Lines PipelineLayout"),
            bind_group_layouts: &[&globals.layout],
            push_constant_ranges: &[],
        });

        const ATTRS: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Debug Lines Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &ATTRS,
                }],
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
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            vbo: Self::create_vbo(device, Self::INITIAL_CAPACITY),
            capacity: Self::INITIAL_CAPACITY,
            vertices: Vec::new(),
        }
    }

    fn create_vbo(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Debug Lines VBO"),
            size: capacity * std::mem::size_of::<LineVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Starts a new frame's worth of lines.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn push_segments(&mut self, segments: &[Segment], color: Vec3) {
        let color = color.to_array();
        self.vertices.extend(segments.iter().flat_map(|[a, b]| {
            [
                LineVertex { position: a.to_array(), color },
                LineVertex { position: b.to_array(), color },
            ]
        }));
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Uploads the queued vertices, growing the buffer when needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let needed = self.vertices.len() as u64;
        if needed == 0 {
            return;
        }
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.vbo = Self::create_vbo(device, self.capacity);
        }
        queue.write_buffer(&self.vbo, 0, bytemuck::cast_slice(&self.vertices));
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, globals: &'a SceneGlobals) {
        if self.vertices.is_empty() {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &globals.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vbo.slice(..));
        rpass.draw(0..self.vertices.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<LineVertex>(), 24);
        assert_eq!(std::mem::align_of::<LineVertex>(), 4);
    }
}
