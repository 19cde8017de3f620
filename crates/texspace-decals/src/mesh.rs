//! Immutable triangle mesh with per-vertex UVs, split into submeshes.

use crate::error::{DecalError, Result};
use glam::{Vec2, Vec3};

/// Per-vertex data. Must match the vertex layout declared by the viewer's
/// WGSL pipelines (location 0 position, 1 normal, 2 uv).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    pub fn uv(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }
}

/// A contiguous range of the index buffer drawn with a vertex offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    pub base_index: u32,
    pub index_count: u32,
    pub base_vertex: u32,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    submeshes: Vec<SubMesh>,
}

impl Mesh {
    /// Validates and wraps externally supplied geometry.
    ///
    /// Every vertex must carry a finite position and a UV inside [0, 1]², and
    /// every submesh must resolve to in-range vertices.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, submeshes: Vec<SubMesh>) -> Result<Self> {
        for (i, v) in vertices.iter().enumerate() {
            if !v.pos().is_finite() {
                return Err(DecalError::NonFinitePosition { vertex: i });
            }
            let [u, w] = v.uv;
            if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&w) {
                return Err(DecalError::UvOutOfRange { vertex: i, u, v: w });
            }
        }

        let mut triangles = 0usize;
        for (s, sub) in submeshes.iter().enumerate() {
            if sub.index_count % 3 != 0 {
                return Err(DecalError::RaggedIndices {
                    submesh: s,
                    count: sub.index_count,
                });
            }
            let start = sub.base_index as usize;
            let end = start + sub.index_count as usize;
            if end > indices.len() {
                return Err(DecalError::SubmeshOutOfRange {
                    submesh: s,
                    start,
                    end,
                    len: indices.len(),
                });
            }
            for &idx in &indices[start..end] {
                let resolved = sub.base_vertex as usize + idx as usize;
                if resolved >= vertices.len() {
                    return Err(DecalError::VertexOutOfRange {
                        index: resolved,
                        vertex_count: vertices.len(),
                    });
                }
            }
            triangles += sub.index_count as usize / 3;
        }

        if triangles == 0 {
            return Err(DecalError::EmptyMesh);
        }

        log::debug!(
            "Mesh validated: {} vertices, {} triangles, {} submeshes",
            vertices.len(),
            triangles,
            submeshes.len()
        );

        Ok(Self {
            vertices,
            indices,
            submeshes,
        })
    }

    /// Convenience constructor for a single submesh covering all indices.
    pub fn single(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        let sub = SubMesh {
            base_index: 0,
            index_count: indices.len() as u32,
            base_vertex: 0,
        };
        Self::new(vertices, indices, vec![sub])
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes
            .iter()
            .map(|s| s.index_count as usize / 3)
            .sum()
    }

    /// Iterates every triangle as three absolute vertex indices, in submesh
    /// order. Rasterization order (and so blend order) follows this sequence.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.submeshes.iter().flat_map(move |sub| {
            let start = sub.base_index as usize;
            let end = start + sub.index_count as usize;
            self.indices[start..end].chunks_exact(3).map(move |t| {
                [
                    sub.base_vertex + t[0],
                    sub.base_vertex + t[1],
                    sub.base_vertex + t[2],
                ]
            })
        })
    }

    /// Index buffer with submesh base vertices folded in, ready for a single
    /// non-offset draw or an intersector build.
    pub fn flattened_indices(&self) -> Vec<u32> {
        self.triangles().flatten().collect()
    }

    #[inline]
    pub fn vertex(&self, index: u32) -> &Vertex {
        &self.vertices[index as usize]
    }

    /// Replaces every vertex normal with the area-weighted average of the
    /// adjacent face normals.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        let tris: Vec<[u32; 3]> = self.triangles().collect();
        for [a, b, c] in tris {
            let (pa, pb, pc) = (
                self.vertex(a).pos(),
                self.vertex(b).pos(),
                self.vertex(c).pos(),
            );
            // Unnormalized cross product weights by area.
            let n = (pb - pa).cross(pc - pa);
            accum[a as usize] += n;
            accum[b as usize] += n;
            accum[c as usize] += n;
        }
        for (v, n) in self.vertices.iter_mut().zip(accum) {
            v.normal = n.normalize_or_zero().to_array();
        }
    }

    /// Axis-aligned bounds of all vertex positions.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), v| (lo.min(v.pos()), hi.max(v.pos())),
        )
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use super::*;

    /// An axis-aligned quad in the plane `z = z`, facing +Z (counter-clockwise
    /// seen from +Z), spanning `[-half, half]²` in XY and the UV rectangle
    /// `uv_min..uv_max`.
    pub fn quad_vertices(z: f32, half: f32, center: Vec2, uv_min: Vec2, uv_max: Vec2) -> [Vertex; 4] {
        let n = Vec3::Z;
        let p = |x: f32, y: f32| Vec3::new(center.x + x, center.y + y, z);
        [
            Vertex::new(p(-half, -half), n, Vec2::new(uv_min.x, uv_min.y)),
            Vertex::new(p(half, -half), n, Vec2::new(uv_max.x, uv_min.y)),
            Vertex::new(p(half, half), n, Vec2::new(uv_max.x, uv_max.y)),
            Vertex::new(p(-half, half), n, Vec2::new(uv_min.x, uv_max.y)),
        ]
    }

    /// Builds a mesh from a list of quads, one submesh per quad.
    pub fn quads(quads: &[[Vertex; 4]]) -> Mesh {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let mut submeshes = Vec::new();
        for q in quads {
            submeshes.push(SubMesh {
                base_index: indices.len() as u32,
                index_count: 6,
                base_vertex: vertices.len() as u32,
            });
            vertices.extend_from_slice(q);
            indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        }
        Mesh::new(vertices, indices, submeshes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_meshes::*;
    use super::*;

    #[test]
    fn triangles_fold_in_base_vertex() {
        let a = quad_vertices(0.0, 1.0, Vec2::ZERO, Vec2::ZERO, Vec2::splat(0.5));
        let b = quad_vertices(1.0, 1.0, Vec2::ZERO, Vec2::splat(0.5), Vec2::ONE);
        let mesh = quads(&[a, b]);

        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(tris.len(), 4);
        assert_eq!(tris[2], [4, 5, 6]);
        assert_eq!(mesh.flattened_indices().len(), 12);
    }

    #[test]
    fn uv_outside_unit_square_is_rejected() {
        let mut verts = quad_vertices(0.0, 1.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE).to_vec();
        verts[2].uv = [1.5, 0.2];
        let err = Mesh::single(verts, vec![0, 1, 2, 0, 2, 3]).unwrap_err();
        assert!(matches!(err, DecalError::UvOutOfRange { vertex: 2, .. }));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let verts = quad_vertices(0.0, 1.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE).to_vec();
        let err = Mesh::single(verts, vec![0, 1, 7]).unwrap_err();
        assert!(matches!(err, DecalError::VertexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn empty_mesh_is_rejected() {
        assert!(matches!(
            Mesh::single(Vec::new(), Vec::new()),
            Err(DecalError::EmptyMesh)
        ));
    }

    #[test]
    fn recomputed_normals_follow_winding() {
        let mut verts = quad_vertices(0.0, 1.0, Vec2::ZERO, Vec2::ZERO, Vec2::ONE).to_vec();
        for v in &mut verts {
            v.normal = [0.0; 3];
        }
        let mut mesh = Mesh::single(verts, vec![0, 1, 2, 0, 2, 3]).unwrap();
        mesh.recompute_normals();
        for v in mesh.vertices() {
            assert!((Vec3::from_array(v.normal) - Vec3::Z).length() < 1e-6);
        }
    }
}
