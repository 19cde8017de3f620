//! Line-list geometry for visualising the hit point and projector volume.

use glam::Vec3;

/// Line segment endpoints, consumed as a line list.
pub type Segment = [Vec3; 2];

/// Edges of a box given its eight corners in [`crate::Projector::frustum_corners`]
/// order.
pub fn frustum_lines(corners: &[Vec3; 8]) -> Vec<Segment> {
    let mut lines = Vec::with_capacity(12);
    for i in 0..4 {
        let j = (i + 1) % 4;
        lines.push([corners[i], corners[j]]);
        lines.push([corners[i + 4], corners[j + 4]]);
        lines.push([corners[i], corners[i + 4]]);
    }
    lines
}

/// Three orthogonal great circles around `center`.
pub fn wire_sphere(center: Vec3, radius: f32, segments: u32) -> Vec<Segment> {
    let segments = segments.max(3);
    let step = std::f32::consts::TAU / segments as f32;
    let mut lines = Vec::with_capacity(3 * segments as usize);

    let ring = |a: f32, plane: usize| -> Vec3 {
        let (s, c) = a.sin_cos();
        let local = match plane {
            0 => Vec3::new(c, s, 0.0),
            1 => Vec3::new(c, 0.0, s),
            _ => Vec3::new(0.0, c, s),
        };
        center + local * radius
    };

    for plane in 0..3 {
        for k in 0..segments {
            let a0 = k as f32 * step;
            lines.push([ring(a0, plane), ring(a0 + step, plane)]);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_points_lie_on_radius() {
        let c = Vec3::new(1.0, -2.0, 3.0);
        let lines = wire_sphere(c, 0.5, 16);
        assert_eq!(lines.len(), 48);
        for [a, b] in lines {
            assert!(((a - c).length() - 0.5).abs() < 1e-5);
            assert!(((b - c).length() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn box_has_twelve_edges() {
        let corners = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let lines = frustum_lines(&corners);
        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|[a, b]| ((*a - *b).length() - 1.0).abs() < 1e-6));
    }
}
