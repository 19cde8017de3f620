//! Scanline-free triangle coverage over a pixel grid.
//!
//! Triangles are given in pixel coordinates: x grows right, y grows down, and
//! pixel `(x, y)` covers the square `[x, x + 1] x [y, y + 1]` with its sample at
//! the centre. Barycentrics handed to the callback are in the caller's vertex
//! order regardless of winding.

use glam::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coverage {
    /// Pixel centres inside the triangle, shared edges owned by the top-left
    /// rule so each centre on an edge is emitted by exactly one triangle.
    Standard,
    /// Every pixel whose square overlaps the triangle. Barycentrics are taken
    /// at the pixel centre and may fall outside [0, 1].
    Conservative,
}

/// Edge function, positive on the interior side of `a -> b` for triangles
/// with positive [`signed_area`].
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Twice the signed area of the triangle in pixel space.
#[inline]
pub fn signed_area(tri: &[Vec2; 3]) -> f32 {
    edge(tri[0], tri[1], tri[2])
}

#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

/// Largest value `edge(a, b, _)` takes over the pixel square at `(x, y)`.
#[inline]
fn edge_max_over_square(a: Vec2, b: Vec2, x: f32, y: f32) -> f32 {
    let d = b - a;
    let px = if d.y < 0.0 { x + 1.0 } else { x };
    let py = if d.x > 0.0 { y + 1.0 } else { y };
    edge(a, b, Vec2::new(px, py))
}

/// Calls `emit(x, y, barycentrics)` for every covered pixel of a
/// `width` x `height` grid, row by row. Degenerate triangles emit nothing.
pub fn rasterize<F>(tri: &[Vec2; 3], width: u32, height: u32, coverage: Coverage, mut emit: F)
where
    F: FnMut(u32, u32, Vec3),
{
    let area = signed_area(tri);
    if area == 0.0 || !area.is_finite() || width == 0 || height == 0 {
        return;
    }

    // Normalize to positive winding; `order[k]` is the caller's index of the
    // k-th normalized vertex.
    let order = if area > 0.0 { [0, 1, 2] } else { [0, 2, 1] };
    let v = [tri[order[0]], tri[order[1]], tri[order[2]]];
    let inv_area = 1.0 / area.abs();

    let lo = v[0].min(v[1]).min(v[2]);
    let hi = v[0].max(v[1]).max(v[2]);

    let (x0, x1, y0, y1) = match coverage {
        Coverage::Standard => (
            (lo.x - 0.5).ceil(),
            (hi.x - 0.5).floor(),
            (lo.y - 0.5).ceil(),
            (hi.y - 0.5).floor(),
        ),
        Coverage::Conservative => (
            lo.x.floor(),
            hi.x.ceil() - 1.0,
            lo.y.floor(),
            hi.y.ceil() - 1.0,
        ),
    };
    let x0 = x0.max(0.0) as i64;
    let y0 = y0.max(0.0) as i64;
    let x1 = x1.min(width as f32 - 1.0) as i64;
    let y1 = y1.min(height as f32 - 1.0) as i64;
    if x1 < x0 || y1 < y0 {
        return;
    }

    // Edge k is opposite vertex k.
    let edges = [(v[1], v[2]), (v[2], v[0]), (v[0], v[1])];
    let owns = edges.map(|(a, b)| is_top_left(a, b));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let (fx, fy) = (x as f32, y as f32);
            let p = Vec2::new(fx + 0.5, fy + 0.5);
            let w = edges.map(|(a, b)| edge(a, b, p));

            let covered = match coverage {
                Coverage::Standard => (0..3).all(|k| w[k] > 0.0 || (w[k] == 0.0 && owns[k])),
                Coverage::Conservative => edges
                    .iter()
                    .all(|&(a, b)| edge_max_over_square(a, b, fx, fy) > 0.0),
            };
            if !covered {
                continue;
            }

            let mut bary = Vec3::ZERO;
            for k in 0..3 {
                bary[order[k]] = w[k] * inv_area;
            }
            emit(x as u32, y as u32, bary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage_counts(tris: &[[Vec2; 3]], size: u32, mode: Coverage) -> Vec<u32> {
        let mut counts = vec![0u32; (size * size) as usize];
        for t in tris {
            rasterize(t, size, size, mode, |x, y, _| counts[(y * size + x) as usize] += 1);
        }
        counts
    }

    #[test]
    fn shared_diagonal_is_painted_once() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(4.0, 0.0);
        let c = Vec2::new(4.0, 4.0);
        let d = Vec2::new(0.0, 4.0);
        // Opposite windings; the diagonal passes through pixel centres.
        let counts = coverage_counts(&[[a, b, c], [a, d, c]], 4, Coverage::Standard);
        assert!(counts.iter().all(|&n| n == 1), "{counts:?}");
    }

    #[test]
    fn sliver_misses_centres_but_not_texels() {
        let sliver = [
            Vec2::new(0.1, 0.1),
            Vec2::new(3.9, 0.2),
            Vec2::new(0.1, 0.3),
        ];
        let standard = coverage_counts(&[sliver], 4, Coverage::Standard);
        assert!(standard.iter().all(|&n| n == 0));

        let conservative = coverage_counts(&[sliver], 4, Coverage::Conservative);
        assert_eq!(&conservative[..4], &[1, 1, 1, 1]);
        assert!(conservative[4..].iter().all(|&n| n == 0));
    }

    #[test]
    fn conservative_is_superset_of_standard() {
        let tri = [
            Vec2::new(1.3, 0.7),
            Vec2::new(7.2, 3.1),
            Vec2::new(2.6, 6.9),
        ];
        let standard = coverage_counts(&[tri], 8, Coverage::Standard);
        let conservative = coverage_counts(&[tri], 8, Coverage::Conservative);
        assert!(standard.iter().sum::<u32>() > 0);
        for (s, c) in standard.iter().zip(&conservative) {
            assert!(s <= c);
        }
    }

    #[test]
    fn barycentrics_follow_caller_order() {
        let tri = [
            Vec2::new(0.5, 0.5),
            Vec2::new(0.5, 8.5),
            Vec2::new(8.5, 0.5),
        ];
        let mut at_origin = None;
        rasterize(&tri, 16, 16, Coverage::Standard, |x, y, b| {
            assert!((b.x + b.y + b.z - 1.0).abs() < 1e-5);
            if (x, y) == (0, 0) {
                at_origin = Some(b);
            }
        });
        let b = at_origin.unwrap();
        assert!((b - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn clipped_to_grid() {
        let tri = [
            Vec2::new(-10.0, -10.0),
            Vec2::new(30.0, -10.0),
            Vec2::new(-10.0, 30.0),
        ];
        let counts = coverage_counts(&[tri], 4, Coverage::Conservative);
        assert!(counts.iter().all(|&n| n == 1));
    }

    #[test]
    fn degenerate_triangle_emits_nothing() {
        let line = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(4.0, 4.0)];
        let counts = coverage_counts(&[line], 4, Coverage::Conservative);
        assert!(counts.iter().all(|&n| n == 0));
    }
}
