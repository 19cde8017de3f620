//! User-facing decal parameters and the optional generator that randomizes
//! them on each pick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_HALF_WIDTH: f32 = 0.1;
pub const MAX_HALF_WIDTH: f32 = 20.0;
pub const MIN_ROTATION: f32 = -180.0;
pub const MAX_ROTATION: f32 = 180.0;

/// Footprint and decal selection for the next stamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecalParams {
    pub half_width: f32,
    pub rotation_degrees: f32,
    pub decal_index: usize,
}

impl Default for DecalParams {
    fn default() -> Self {
        Self {
            half_width: 10.0,
            rotation_degrees: 0.0,
            decal_index: 0,
        }
    }
}

impl DecalParams {
    /// Clamps every field into its valid range for a catalog of
    /// `decal_count` images (`decal_count` of zero pins the index to 0).
    pub fn clamped(self, decal_count: usize) -> Self {
        let half_width = if self.half_width.is_nan() {
            MIN_HALF_WIDTH
        } else {
            self.half_width.clamp(MIN_HALF_WIDTH, MAX_HALF_WIDTH)
        };
        let rotation_degrees = if self.rotation_degrees.is_nan() {
            0.0
        } else {
            self.rotation_degrees.clamp(MIN_ROTATION, MAX_ROTATION)
        };
        Self {
            half_width,
            rotation_degrees,
            decal_index: self.decal_index.min(decal_count.saturating_sub(1)),
        }
    }
}

/// Toggles exposed to the debug panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecalSettings {
    pub randomize_on_pick: bool,
    pub conservative_rasterization: bool,
    pub visualize_projector_frustum: bool,
    pub visualize_hit_point: bool,
    pub visualize_canvas: bool,
}

impl Default for DecalSettings {
    fn default() -> Self {
        Self {
            randomize_on_pick: true,
            conservative_rasterization: true,
            visualize_projector_frustum: false,
            visualize_hit_point: false,
            visualize_canvas: false,
        }
    }
}

/// Strategy that proposes parameters for a fresh pick.
pub trait ParamGenerator: Send {
    fn generate(&mut self, current: &DecalParams, decal_count: usize) -> DecalParams;
}

/// Uniform random footprint, rotation and decal.
pub struct RandomParams {
    rng: StdRng,
}

impl RandomParams {
    pub const HALF_WIDTH_RANGE: std::ops::Range<f32> = 5.0..20.0;
    pub const ROTATION_RANGE: std::ops::Range<f32> = -90.0..90.0;

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ParamGenerator for RandomParams {
    fn generate(&mut self, current: &DecalParams, decal_count: usize) -> DecalParams {
        let decal_index = if decal_count == 0 {
            current.decal_index
        } else {
            self.rng.gen_range(0..decal_count)
        };
        DecalParams {
            half_width: self.rng.gen_range(Self::HALF_WIDTH_RANGE),
            rotation_degrees: self.rng.gen_range(Self::ROTATION_RANGE),
            decal_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_respects_ranges() {
        let p = DecalParams {
            half_width: 50.0,
            rotation_degrees: -400.0,
            decal_index: 9,
        }
        .clamped(4);
        assert_eq!(p.half_width, MAX_HALF_WIDTH);
        assert_eq!(p.rotation_degrees, MIN_ROTATION);
        assert_eq!(p.decal_index, 3);

        let tiny = DecalParams {
            half_width: 0.0,
            ..DecalParams::default()
        }
        .clamped(1);
        assert_eq!(tiny.half_width, MIN_HALF_WIDTH);
    }

    #[test]
    fn random_params_stay_in_range() {
        let mut gen = RandomParams::seeded(7);
        for _ in 0..200 {
            let p = gen.generate(&DecalParams::default(), 4);
            assert!(RandomParams::HALF_WIDTH_RANGE.contains(&p.half_width));
            assert!(RandomParams::ROTATION_RANGE.contains(&p.rotation_degrees));
            assert!(p.decal_index < 4);
        }
    }

    #[test]
    fn seeded_generators_repeat() {
        let mut a = RandomParams::seeded(42);
        let mut b = RandomParams::seeded(42);
        let cur = DecalParams::default();
        for _ in 0..10 {
            assert_eq!(a.generate(&cur, 3), b.generate(&cur, 3));
        }
    }
}
