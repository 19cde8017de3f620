//! UV-space passes over the albedo canvas.
//!
//! Both passes unfold the mesh into texture space: each vertex is placed at
//! its UV scaled to the canvas, while its world position rides along as an
//! attribute for the stamp pass.

use crate::canvas::{AlbedoCanvas, Rgba8};
use crate::decal::DecalImage;
use crate::mesh::Mesh;
use crate::occlusion::OcclusionMap;
use crate::raster::{rasterize, Coverage};
use glam::{Mat4, Vec2, Vec3};

fn unfolded(mesh: &Mesh, tri: [u32; 3], size: f32) -> [Vec2; 3] {
    tri.map(|i| mesh.vertex(i).uv() * size)
}

/// Clears the canvas to `clear_color`, then writes `base_color` into every
/// texel a triangle covers. No blending.
pub fn initialize(
    canvas: &mut AlbedoCanvas,
    mesh: &Mesh,
    base_color: Rgba8,
    clear_color: Rgba8,
    coverage: Coverage,
) {
    canvas.fill(clear_color);
    let size = canvas.size();

    for tri in mesh.triangles() {
        let uv = unfolded(mesh, tri, size as f32);
        rasterize(&uv, size, size, coverage, |x, y, _| {
            *canvas.texel_mut(x, y) = base_color;
        });
    }
}

/// Per-fragment stamp inputs shared across every triangle of one pass.
pub struct StampContext<'a> {
    pub light_view_proj: Mat4,
    pub occlusion: &'a OcclusionMap,
    pub decal: &'a DecalImage,
    pub depth_bias: f32,
}

impl StampContext<'_> {
    /// Decal color for a surface point, or `None` when the point is outside
    /// the projector volume or hidden behind nearer geometry.
    pub fn shade(&self, world: Vec3) -> Option<[f32; 4]> {
        let clip = self.light_view_proj * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let p = clip.truncate() / clip.w;

        if p.x.abs() > 1.0 || p.y.abs() > 1.0 || !(0.0..=1.0).contains(&p.z) {
            return None;
        }
        if self.occlusion.sample_ndc(p.x, p.y) < p.z - self.depth_bias {
            return None;
        }

        Some(self.decal.sample(p.x * 0.5 + 0.5, 0.5 - p.y * 0.5))
    }
}

/// Straight-alpha source-over on all four channels.
#[inline]
pub fn blend_over(dst: Rgba8, src: [f32; 4]) -> Rgba8 {
    let a = src[3];
    let mut out = [0u8; 4];
    for c in 0..4 {
        let d = dst[c] as f32 / 255.0;
        let v = src[c] * a + d * (1.0 - a);
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Blends the projected decal into every covered texel that passes the clip
/// and occlusion tests. Returns the number of fragments written.
pub fn stamp(canvas: &mut AlbedoCanvas, mesh: &Mesh, ctx: &StampContext<'_>, coverage: Coverage) -> usize {
    let size = canvas.size();
    let mut written = 0;

    for tri in mesh.triangles() {
        let uv = unfolded(mesh, tri, size as f32);
        let world = tri.map(|i| mesh.vertex(i).pos());

        rasterize(&uv, size, size, coverage, |x, y, b| {
            let pos = world[0] * b.x + world[1] * b.y + world[2] * b.z;
            if let Some(src) = ctx.shade(pos) {
                let texel = canvas.texel_mut(x, y);
                *texel = blend_over(*texel, src);
                written += 1;
            }
        });
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{quad_vertices, quads};

    #[test]
    fn opaque_source_replaces_destination() {
        assert_eq!(blend_over([10, 20, 30, 40], [1.0, 0.0, 0.0, 1.0]), [255, 0, 0, 255]);
    }

    #[test]
    fn transparent_source_keeps_destination() {
        assert_eq!(blend_over([10, 20, 30, 40], [1.0, 1.0, 1.0, 0.0]), [10, 20, 30, 40]);
    }

    #[test]
    fn half_alpha_mixes_every_channel() {
        // Alpha blends too: 0.5 * 0.5 + 1.0 * 0.5.
        assert_eq!(blend_over([0, 0, 0, 255], [1.0, 0.0, 0.0, 0.5]), [128, 0, 0, 191]);
    }

    #[test]
    fn initialize_covers_only_triangles() {
        let quad = quad_vertices(0.0, 1.0, Vec2::ZERO, Vec2::ZERO, Vec2::splat(0.5));
        let mesh = quads(&[quad]);
        let mut canvas = AlbedoCanvas::new(16, [1, 2, 3, 4]);
        initialize(&mut canvas, &mesh, [200, 200, 200, 255], [0, 0, 0, 255], Coverage::Standard);

        for y in 0..16 {
            for x in 0..16 {
                let expected = if x < 8 && y < 8 {
                    [200, 200, 200, 255]
                } else {
                    [0, 0, 0, 255]
                };
                assert_eq!(canvas.texel(x, y), expected, "texel {x},{y}");
            }
        }
    }
}
