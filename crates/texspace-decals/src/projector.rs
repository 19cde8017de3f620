use crate::config::DecalConfig;
use crate::picker::HitRecord;
use glam::{Mat4, Quat, Vec3, Vec4};

/// |forward . Y| above which +Y is too close to the view axis to serve as the
/// up reference.
const PARALLEL_UP_THRESHOLD: f32 = 0.999;

/// Orthographic camera that stamps a decal onto the surface around a hit point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
    pub eye: Vec3,
    /// Look-at target, the picked surface point.
    pub target: Vec3,
    /// Unit view direction, the negated hit normal.
    pub forward: Vec3,
    pub up: Vec3,
    pub half_width: f32,
    pub half_height: f32,
    pub near: f32,
    pub far: f32,
}

impl Projector {
    /// Derives the projector for `hit`. Returns `None` for a miss, leaving the
    /// caller's previous projector in charge.
    ///
    /// `decal_aspect` is height over width of the selected decal image.
    pub fn build(
        hit: &HitRecord,
        half_width: f32,
        rotation_degrees: f32,
        decal_aspect: f32,
        config: &DecalConfig,
    ) -> Option<Self> {
        if !hit.is_hit() {
            return None;
        }
        let normal = hit.normal.try_normalize()?;
        let forward = -normal;

        let reference = if forward.dot(Vec3::Y).abs() > PARALLEL_UP_THRESHOLD {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let up = Quat::from_axis_angle(forward, rotation_degrees.to_radians()) * reference;

        Some(Self {
            eye: hit.position + normal * config.backoff_distance,
            target: hit.position,
            forward,
            up,
            half_width,
            half_height: half_width * decal_aspect,
            near: config.projector_near,
            far: config.projector_far,
        })
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Orthographic projection with depth mapped to [0, 1].
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(
            -self.half_width,
            self.half_width,
            -self.half_height,
            self.half_height,
            self.near,
            self.far,
        )
    }

    /// `projection * view`, the matrix every occlusion and stamp pass consumes.
    pub fn light_view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space corners of the projector volume: near plane first, then
    /// far plane, each ordered (-x,-y), (+x,-y), (+x,+y), (-x,+y) in NDC.
    pub fn frustum_corners(&self) -> [Vec3; 8] {
        let inv = self.light_view_proj().inverse();
        let mut corners = [Vec3::ZERO; 8];
        let ndc = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        for (plane, z) in [0.0f32, 1.0].into_iter().enumerate() {
            for (i, &(x, y)) in ndc.iter().enumerate() {
                let p = inv * Vec4::new(x, y, z, 1.0);
                corners[plane * 4 + i] = p.truncate() / p.w;
            }
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4Swizzles;

    fn hit(position: Vec3, normal: Vec3) -> HitRecord {
        HitRecord {
            position,
            normal,
            distance: 5.0,
        }
    }

    #[test]
    fn eye_backs_off_along_normal() {
        let h = hit(Vec3::new(1.0, 2.0, 3.0), Vec3::X);
        let p = Projector::build(&h, 10.0, 0.0, 1.0, &DecalConfig::default()).unwrap();

        assert_eq!(p.eye, Vec3::new(11.0, 2.0, 3.0));
        assert_eq!(p.forward, -Vec3::X);
        assert_eq!(p.target, h.position);
    }

    #[test]
    fn miss_builds_nothing() {
        assert!(Projector::build(&HitRecord::MISS, 10.0, 0.0, 1.0, &DecalConfig::default()).is_none());
    }

    #[test]
    fn footprint_edges_land_on_ndc_bounds() {
        let h = hit(Vec3::ZERO, Vec3::Z);
        let p = Projector::build(&h, 10.0, 0.0, 0.5, &DecalConfig::default()).unwrap();
        let m = p.light_view_proj();

        let centre = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(centre.xy().length() < 1e-5);
        let expected_z = (10.0 - 0.1) / (1000.0 - 0.1);
        assert!((centre.z - expected_z).abs() < 1e-5);

        let right = m * Vec4::new(10.0, 0.0, 0.0, 1.0);
        assert!((right.x - 1.0).abs() < 1e-5);
        let top = m * Vec4::new(0.0, 5.0, 0.0, 1.0);
        assert!((top.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_turns_the_up_axis_about_forward() {
        let h = hit(Vec3::ZERO, Vec3::Z);
        let p = Projector::build(&h, 10.0, 90.0, 1.0, &DecalConfig::default()).unwrap();

        assert!(p.up.dot(p.forward).abs() < 1e-6);
        assert!(p.up.dot(Vec3::Y).abs() < 1e-6);
        assert!((p.up.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vertical_normal_uses_z_reference() {
        let h = hit(Vec3::ZERO, Vec3::Y);
        let p = Projector::build(&h, 10.0, 0.0, 1.0, &DecalConfig::default()).unwrap();

        assert_eq!(p.up, Vec3::Z);
        assert!(p.light_view_proj().is_finite());
    }

    #[test]
    fn frustum_corners_bracket_the_hit() {
        let h = hit(Vec3::ZERO, Vec3::Z);
        let p = Projector::build(&h, 4.0, 0.0, 1.0, &DecalConfig::default()).unwrap();
        let c = p.frustum_corners();

        for corner in &c[..4] {
            assert!((corner.z - 9.9).abs() < 1e-3);
            assert!((corner.x.abs() - 4.0).abs() < 1e-3);
        }
        for corner in &c[4..] {
            assert!((corner.z + 990.0).abs() < 1e-1);
        }
    }
}
