use glam::{Mat4, Vec3};

/// Per-frame state shared by every shader-bound pass. Must match the
/// `Globals` struct declared in the viewer's WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalFrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz = camera position, w unused.
    pub cam_pos: [f32; 4],
}

impl GlobalFrameUniforms {
    pub fn new(view_proj: Mat4, light_view_proj: Mat4, cam_pos: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            cam_pos: cam_pos.extend(0.0).to_array(),
        }
    }
}

impl Default for GlobalFrameUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_std140_friendly() {
        assert_eq!(std::mem::size_of::<GlobalFrameUniforms>(), 144);
        let u = GlobalFrameUniforms::new(Mat4::IDENTITY, Mat4::from_scale(Vec3::splat(2.0)), Vec3::X);
        assert_eq!(u.light_view_proj[1][1], 2.0);
        assert_eq!(u.cam_pos, [1.0, 0.0, 0.0, 0.0]);
    }
}
