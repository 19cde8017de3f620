//! Nearest-hit ray queries over mesh triangles, accelerated by a bounding
//! volume hierarchy built once per mesh.

use crate::error::{DecalError, Result};
use crate::mesh::Mesh;
use glam::Vec3;

/// Triangles per leaf before a node is split.
const MAX_LEAF_TRIANGLES: usize = 4;
/// Determinant magnitude under which a ray is treated as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Builds a ray, normalizing `direction`. Returns `None` for a zero or
    /// non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        origin.is_finite().then_some(Self { origin, direction })
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a successful nearest-hit query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray.
    pub t: f32,
    /// Index of the triangle in [`Mesh::triangles`] order.
    pub triangle: u32,
    /// Unit geometric normal, `(v1 - v0) x (v2 - v0)` normalized.
    pub normal: Vec3,
}

/// Anything that can answer nearest-hit triangle queries.
pub trait Intersector {
    fn intersect(&self, ray: &Ray) -> Option<TriangleHit>;
}

#[derive(Clone, Copy, Debug)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Slab test. Returns the entry distance when the ray overlaps the box
    /// within `[0, t_max]`.
    ///
    /// An axis the ray runs parallel to only constrains the origin; it never
    /// goes through `inv_dir`, where `0 * inf` would poison the interval.
    fn hit(&self, ray: &Ray, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let mut t_near = 0.0f32;
        let mut t_far = t_max;
        for axis in 0..3 {
            let o = ray.origin[axis];
            if ray.direction[axis] == 0.0 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (self.min[axis] - o) * inv_dir[axis];
            let t1 = (self.max[axis] - o) * inv_dir[axis];
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }
        (t_near <= t_far).then_some(t_near)
    }
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    bounds: Aabb,
    /// Left child index for interior nodes, first triangle slot for leaves.
    first: u32,
    /// Triangle count; zero marks an interior node whose children are
    /// `first` and `first + 1`.
    count: u32,
}

/// Bounding volume hierarchy over a triangle soup.
pub struct Bvh {
    nodes: Vec<BvhNode>,
    /// Triangle ids in leaf order.
    order: Vec<u32>,
    /// Triangle corners, indexed by triangle id.
    triangles: Vec<[Vec3; 3]>,
}

impl Bvh {
    /// Builds the hierarchy from positions and a flat triangle index list.
    pub fn build(positions: &[Vec3], indices: &[u32]) -> Result<Self> {
        if indices.len() < 3 {
            return Err(DecalError::EmptyMesh);
        }

        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            let mut corners = [Vec3::ZERO; 3];
            for (c, &i) in corners.iter_mut().zip(tri) {
                *c = *positions
                    .get(i as usize)
                    .ok_or(DecalError::VertexOutOfRange {
                        index: i as usize,
                        vertex_count: positions.len(),
                    })?;
            }
            triangles.push(corners);
        }

        let centroids: Vec<Vec3> = triangles
            .iter()
            .map(|[a, b, c]| (*a + *b + *c) / 3.0)
            .collect();

        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * triangles.len() / MAX_LEAF_TRIANGLES + 1),
            order: (0..triangles.len() as u32).collect(),
            triangles,
        };

        bvh.nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            first: 0,
            count: bvh.order.len() as u32,
        });
        bvh.subdivide(0, &centroids);

        log::debug!(
            "BVH built: {} triangles, {} nodes",
            bvh.triangles.len(),
            bvh.nodes.len()
        );

        Ok(bvh)
    }

    /// Builds the hierarchy over every triangle of `mesh`.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        let positions: Vec<Vec3> = mesh.vertices().iter().map(|v| v.pos()).collect();
        Self::build(&positions, &mesh.flattened_indices())
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn subdivide(&mut self, node_idx: usize, centroids: &[Vec3]) {
        let first = self.nodes[node_idx].first as usize;
        let count = self.nodes[node_idx].count as usize;

        let mut bounds = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &tri in &self.order[first..first + count] {
            for &p in &self.triangles[tri as usize] {
                bounds.grow(p);
            }
            centroid_bounds.grow(centroids[tri as usize]);
        }
        self.nodes[node_idx].bounds = bounds;

        if count <= MAX_LEAF_TRIANGLES {
            return;
        }

        let extent = centroid_bounds.max - centroid_bounds.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        if extent[axis] <= 0.0 {
            // All centroids coincide; splitting cannot separate them.
            return;
        }

        let mid = count / 2;
        self.order[first..first + count].select_nth_unstable_by(mid, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        let left = self.nodes.len();
        self.nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            first: first as u32,
            count: mid as u32,
        });
        self.nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            first: (first + mid) as u32,
            count: (count - mid) as u32,
        });
        self.nodes[node_idx].first = left as u32;
        self.nodes[node_idx].count = 0;

        self.subdivide(left, centroids);
        self.subdivide(left + 1, centroids);
    }
}

impl Intersector for Bvh {
    fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        let inv_dir = ray.direction.recip();
        let mut best: Option<TriangleHit> = None;
        let mut best_t = f32::INFINITY;

        let mut stack = Vec::with_capacity(64);
        stack.push(0usize);

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.bounds.hit(ray, inv_dir, best_t).is_none() {
                continue;
            }

            if node.count > 0 {
                let first = node.first as usize;
                for &tri in &self.order[first..first + node.count as usize] {
                    if let Some(t) = intersect_triangle(ray, &self.triangles[tri as usize]) {
                        if t < best_t {
                            best_t = t;
                            let [a, b, c] = self.triangles[tri as usize];
                            best = Some(TriangleHit {
                                t,
                                triangle: tri,
                                normal: (b - a).cross(c - a).normalize_or_zero(),
                            });
                        }
                    }
                }
            } else {
                let left = node.first as usize;
                stack.push(left);
                stack.push(left + 1);
            }
        }

        best
    }
}

/// Two-sided Möller–Trumbore intersection. Returns the hit distance.
fn intersect_triangle(ray: &Ray, [a, b, c]: &[Vec3; 3]) -> Option<f32> {
    let e1 = *b - *a;
    let e2 = *c - *a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = det.recip();

    let s = ray.origin - *a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t > 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> (Vec<Vec3>, Vec<u32>) {
        // n x n quads in the plane z = 0, each split in two CCW triangles.
        let mut pos = Vec::new();
        let mut idx = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                pos.push(Vec3::new(x as f32, y as f32, 0.0));
            }
        }
        let row = (n + 1) as u32;
        for y in 0..n as u32 {
            for x in 0..n as u32 {
                let i = y * row + x;
                idx.extend_from_slice(&[i, i + 1, i + row + 1, i, i + row + 1, i + row]);
            }
        }
        (pos, idx)
    }

    /// `n` unit quads along +X in the plane z = 0, so the root splits at x = n / 2.
    fn strip(n: usize) -> (Vec<Vec3>, Vec<u32>) {
        let mut pos = Vec::new();
        let mut idx = Vec::new();
        for x in 0..=n {
            pos.push(Vec3::new(x as f32, 0.0, 0.0));
            pos.push(Vec3::new(x as f32, 1.0, 0.0));
        }
        for x in 0..n as u32 {
            let i = 2 * x;
            idx.extend_from_slice(&[i, i + 2, i + 3, i, i + 3, i + 1]);
        }
        (pos, idx)
    }

    fn brute_force(ray: &Ray, pos: &[Vec3], idx: &[u32]) -> f32 {
        idx.chunks_exact(3)
            .filter_map(|t| {
                intersect_triangle(
                    ray,
                    &[pos[t[0] as usize], pos[t[1] as usize], pos[t[2] as usize]],
                )
            })
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn hits_nearest_of_two_planes() {
        let pos = vec![
            // near plane z = 0
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            // far plane z = -5
            Vec3::new(-1.0, -1.0, -5.0),
            Vec3::new(1.0, -1.0, -5.0),
            Vec3::new(0.0, 1.0, -5.0),
        ];
        let bvh = Bvh::build(&pos, &[3, 4, 5, 0, 1, 2]).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z).unwrap();

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.t - 10.0).abs() < 1e-5);
        assert_eq!(hit.triangle, 1);
        assert!((hit.normal - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn back_faces_are_hit_with_face_normal() {
        let pos = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let bvh = Bvh::build(&pos, &[0, 1, 2]).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z).unwrap();

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn miss_returns_none() {
        let (pos, idx) = grid(8);
        let bvh = Bvh::build(&pos, &idx).unwrap();
        let ray = Ray::new(Vec3::new(20.0, 20.0, 5.0), -Vec3::Z).unwrap();
        assert!(bvh.intersect(&ray).is_none());

        let away = Ray::new(Vec3::new(4.0, 4.0, 5.0), Vec3::Z).unwrap();
        assert!(bvh.intersect(&away).is_none());
    }

    #[test]
    fn agrees_with_brute_force_on_a_grid() {
        let (pos, idx) = grid(16);
        let bvh = Bvh::build(&pos, &idx).unwrap();

        for k in 0..50 {
            let x = 0.37 + (k as f32) * 0.31;
            let y = 0.11 + (k as f32 * 0.53) % 15.0;
            let ray = Ray::new(Vec3::new(x, y, 3.0), Vec3::new(0.01, -0.02, -1.0)).unwrap();

            let brute = brute_force(&ray, &pos, &idx);

            match bvh.intersect(&ray) {
                Some(hit) => assert!((hit.t - brute).abs() < 1e-4),
                None => assert!(brute.is_infinite()),
            }
        }
    }

    #[test]
    fn axis_aligned_rays_through_leaf_seams_hit() {
        let (pos, idx) = strip(4);
        let bvh = Bvh::build(&pos, &idx).unwrap();

        // x = 1, 2, 3 lie exactly on shared edges; x = 2 is the root split.
        for k in 1..8 {
            let x = k as f32 * 0.5;
            let ray = Ray::new(Vec3::new(x, 0.25, 5.0), -Vec3::Z).unwrap();
            let brute = brute_force(&ray, &pos, &idx);
            assert!((brute - 5.0).abs() < 1e-6, "no triangle under x = {x}");

            let hit = bvh.intersect(&ray).unwrap();
            assert!((hit.t - brute).abs() < 1e-6, "x = {x}");
        }
    }

    #[test]
    fn ray_with_origin_on_split_plane_hits() {
        // The strip stood up in the plane x = 0, running along z and centred
        // on z = 0, where the root split falls.
        let (strip_pos, idx) = strip(4);
        let pos: Vec<Vec3> = strip_pos
            .iter()
            .map(|p| Vec3::new(0.0, p.y, p.x - 2.0))
            .collect();
        let bvh = Bvh::build(&pos, &idx).unwrap();

        let ray = Ray::new(Vec3::new(10.0, 0.25, 0.0), -Vec3::X).unwrap();
        let brute = brute_force(&ray, &pos, &idx);
        assert!((brute - 10.0).abs() < 1e-6);

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.t - 10.0).abs() < 1e-6);
        assert!(hit.normal.x.abs() > 0.999);
    }

    #[test]
    fn axis_aligned_rays_agree_with_brute_force_on_a_grid() {
        let (pos, idx) = grid(16);
        let bvh = Bvh::build(&pos, &idx).unwrap();

        for j in 0..=32 {
            for i in 0..=32 {
                let origin = Vec3::new(i as f32 * 0.5, j as f32 * 0.5, 3.0);
                let ray = Ray::new(origin, -Vec3::Z).unwrap();
                let brute = brute_force(&ray, &pos, &idx);
                match bvh.intersect(&ray) {
                    Some(hit) => assert!((hit.t - brute).abs() < 1e-5, "{origin}"),
                    None => assert!(brute.is_infinite(), "missed at {origin}"),
                }
            }
        }
    }

    #[test]
    fn parallel_ray_outside_the_slab_misses() {
        let (pos, idx) = strip(4);
        let bvh = Bvh::build(&pos, &idx).unwrap();
        let above = Ray::new(Vec3::new(-5.0, 0.25, 1.0), Vec3::X).unwrap();
        assert!(bvh.intersect(&above).is_none());
    }

    #[test]
    fn degenerate_direction_is_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }
}
