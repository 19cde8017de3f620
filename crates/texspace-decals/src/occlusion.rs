//! Projector-space depth map and the CPU depth pass that fills it.

use crate::mesh::Mesh;
use crate::raster::{rasterize, signed_area, Coverage};
use glam::{Mat4, Vec2, Vec3};

/// Square depth buffer in projector NDC. Row 0 is NDC `y = +1`.
#[derive(Clone, Debug)]
pub struct OcclusionMap {
    size: u32,
    depth: Vec<f32>,
}

impl OcclusionMap {
    pub const FAR: f32 = 1.0;

    pub fn new(size: u32) -> Self {
        Self {
            size,
            depth: vec![Self::FAR; (size as usize) * (size as usize)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn clear(&mut self) {
        self.depth.fill(Self::FAR);
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.depth[(y * self.size + x) as usize]
    }

    /// Nearest-texel lookup at projector NDC `(x, y)`, clamped to the edge.
    pub fn sample_ndc(&self, x: f32, y: f32) -> f32 {
        let n = self.size as f32;
        let tx = ((x * 0.5 + 0.5) * n).floor().clamp(0.0, n - 1.0) as u32;
        let ty = ((0.5 - y * 0.5) * n).floor().clamp(0.0, n - 1.0) as u32;
        self.get(tx, ty)
    }

    pub fn depths(&self) -> &[f32] {
        &self.depth
    }

    /// Depth-only render of `mesh` through `light_view_proj`: clears to far,
    /// culls back faces (front = counter-clockwise in NDC), keeps the nearest
    /// depth per texel and clips fragments outside [0, 1].
    pub fn render(&mut self, mesh: &Mesh, light_view_proj: Mat4) {
        self.clear();
        let n = self.size as f32;
        let size = self.size;

        for tri in mesh.triangles() {
            let clip = tri.map(|i| light_view_proj * mesh.vertex(i).pos().extend(1.0));
            if clip.iter().any(|c| c.w <= 0.0) {
                continue;
            }
            let ndc: [Vec3; 3] = clip.map(|c| c.truncate() / c.w);
            let px: [Vec2; 3] =
                ndc.map(|p| Vec2::new((p.x * 0.5 + 0.5) * n, (0.5 - p.y * 0.5) * n));

            // Pixel rows run downward, so counter-clockwise in NDC is negative here.
            if signed_area(&px) >= 0.0 {
                continue;
            }

            let depth = &mut self.depth;
            rasterize(&px, size, size, Coverage::Standard, |x, y, b| {
                let z = b.x * ndc[0].z + b.y * ndc[1].z + b.z * ndc[2].z;
                if !(0.0..=1.0).contains(&z) {
                    return;
                }
                let slot = &mut depth[(y * size + x) as usize];
                if z < *slot {
                    *slot = z;
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecalConfig;
    use crate::mesh::test_meshes::{quad_vertices, quads};
    use crate::picker::HitRecord;
    use crate::projector::Projector;

    fn projector_above_origin(half_width: f32) -> Mat4 {
        let hit = HitRecord {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            distance: 1.0,
        };
        Projector::build(&hit, half_width, 0.0, 1.0, &DecalConfig::default())
            .unwrap()
            .light_view_proj()
    }

    #[test]
    fn front_face_writes_its_depth() {
        let mesh = quads(&[quad_vertices(0.0, 20.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE)]);
        let mut map = OcclusionMap::new(16);
        map.render(&mesh, projector_above_origin(10.0));

        let expected = (10.0 - 0.1) / (1000.0 - 0.1);
        assert!(map.depths().iter().all(|&d| (d - expected).abs() < 1e-5));
    }

    #[test]
    fn back_face_is_culled() {
        let mut verts = quad_vertices(0.0, 20.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE).to_vec();
        verts.swap(1, 3);
        let mesh = Mesh::single(verts, vec![0, 1, 2, 0, 2, 3]).unwrap();
        let mut map = OcclusionMap::new(16);
        map.render(&mesh, projector_above_origin(10.0));

        assert!(map.depths().iter().all(|&d| d == OcclusionMap::FAR));
    }

    #[test]
    fn nearest_surface_wins() {
        let far = quad_vertices(-5.0, 20.0, Vec2::ZERO, Vec2::ZERO, Vec2::splat(0.4));
        let near = quad_vertices(0.0, 20.0, Vec2::ZERO, Vec2::splat(0.5), Vec2::ONE);
        let mut map = OcclusionMap::new(16);
        // Draw order must not matter.
        map.render(&quads(&[near, far]), projector_above_origin(10.0));
        let a = map.sample_ndc(0.0, 0.0);
        map.render(&quads(&[far, near]), projector_above_origin(10.0));
        let b = map.sample_ndc(0.0, 0.0);

        let expected = (10.0 - 0.1) / (1000.0 - 0.1);
        assert!((a - expected).abs() < 1e-5);
        assert_eq!(a, b);
    }

    #[test]
    fn partial_coverage_leaves_far_elsewhere() {
        let small = quad_vertices(0.0, 2.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE);
        let mut map = OcclusionMap::new(16);
        map.render(&quads(&[small]), projector_above_origin(10.0));

        assert!(map.sample_ndc(0.0, 0.0) < 0.5);
        assert_eq!(map.sample_ndc(0.9, 0.9), OcclusionMap::FAR);
        assert_eq!(map.get(0, 0), OcclusionMap::FAR);
    }
}
