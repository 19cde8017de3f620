//! Screen-space picking: pixel coordinates to world rays to surface hits.

use crate::intersect::{Intersector, Ray};
use glam::{Mat4, Vec3, Vec4Swizzles};

/// Surface point selected by a pick. A miss is carried in-band with
/// `distance == f32::INFINITY`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    pub position: Vec3,
    /// Unit geometric normal of the hit triangle.
    pub normal: Vec3,
    pub distance: f32,
}

impl HitRecord {
    pub const MISS: Self = Self {
        position: Vec3::ZERO,
        normal: Vec3::ZERO,
        distance: f32::INFINITY,
    };

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.distance.is_finite()
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::MISS
    }
}

/// World-space ray through pixel `(px, py)` of a `width` x `height` viewport,
/// pixel origin top-left.
///
/// The ray starts on the near plane and points at the far-plane point under
/// the same pixel. Returns `None` when the camera matrices are singular or the
/// viewport is empty.
pub fn screen_ray(px: f32, py: f32, width: f32, height: f32, view: Mat4, proj: Mat4) -> Option<Ray> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let inv = (proj * view).inverse();
    if !inv.is_finite() {
        return None;
    }

    let ndc_x = 2.0 * px / width - 1.0;
    let ndc_y = 1.0 - 2.0 * py / height;

    let near = inv * glam::Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
    let far = inv * glam::Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    if near.w == 0.0 || far.w == 0.0 {
        return None;
    }
    let near = near.xyz() / near.w;
    let far = far.xyz() / far.w;

    Ray::new(near, far - near)
}

/// Queries `intersector` with a world-space ray. Never fails: anything that
/// does not land on a triangle is [`HitRecord::MISS`].
pub fn pick<I: Intersector + ?Sized>(intersector: &I, origin: Vec3, direction: Vec3) -> HitRecord {
    let Some(ray) = Ray::new(origin, direction) else {
        return HitRecord::MISS;
    };
    match intersector.intersect(&ray) {
        Some(hit) => HitRecord {
            position: ray.at(hit.t),
            normal: hit.normal,
            distance: hit.t,
        },
        None => HitRecord::MISS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::Bvh;

    fn unit_square() -> Bvh {
        let pos = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        Bvh::build(&pos, &[0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn centre_pixel_ray_looks_down_the_view_axis() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);

        let ray = screen_ray(50.0, 50.0, 100.0, 100.0, view, proj).unwrap();
        assert!((ray.direction - -Vec3::Z).length() < 1e-4);
        assert!((ray.origin.z - 4.9).abs() < 1e-3);
    }

    #[test]
    fn top_left_pixel_maps_to_upper_left() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);

        let ray = screen_ray(0.0, 0.0, 100.0, 100.0, view, proj).unwrap();
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn pick_reports_position_normal_and_distance() {
        let bvh = unit_square();
        let hit = pick(&bvh, Vec3::new(0.25, 0.5, 3.0), Vec3::new(0.0, 0.0, -2.0));

        assert!(hit.is_hit());
        assert!((hit.distance - 3.0).abs() < 1e-5);
        assert!((hit.position - Vec3::new(0.25, 0.5, 0.0)).length() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn miss_is_infinite_distance() {
        let bvh = unit_square();
        let hit = pick(&bvh, Vec3::new(5.0, 5.0, 3.0), -Vec3::Z);
        assert!(!hit.is_hit());
        assert_eq!(hit.distance, f32::INFINITY);

        assert!(!pick(&bvh, Vec3::ZERO, Vec3::ZERO).is_hit());
    }
}
