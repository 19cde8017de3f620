//! Fixed pipeline configuration, chosen once at startup.

use crate::error::{DecalError, Result};

/// Distance the projector eye is pushed off the surface along the hit normal.
pub const PROJECTOR_BACKOFF_DISTANCE: f32 = 10.0;
/// Near plane of the projector's orthographic frustum.
pub const PROJECTOR_NEAR: f32 = 0.1;
/// Far plane of the projector's orthographic frustum.
pub const PROJECTOR_FAR: f32 = 1000.0;

pub const DEFAULT_CANVAS_SIZE: u32 = 4096;
pub const DEFAULT_OCCLUSION_SIZE: u32 = 512;

/// Resolutions, projector constants and colors used by every decal-apply cycle.
///
/// Canvas and occlusion-map resolutions never change after the
/// [`crate::DecalSystem`] is created.
#[derive(Clone, Debug)]
pub struct DecalConfig {
    /// Width and height of the albedo canvas in texels. Must be a power of two.
    pub canvas_size: u32,
    /// Width and height of the projector-space occlusion map.
    pub occlusion_size: u32,
    pub backoff_distance: f32,
    pub projector_near: f32,
    pub projector_far: f32,
    /// Slack subtracted from a fragment's projector depth before comparing it
    /// against the occlusion map, in normalized [0, 1] depth units.
    pub depth_bias: f32,
    /// Color written by the initialize pass into every covered texel.
    pub base_color: [u8; 4],
    /// Color of texels no triangle covers.
    pub clear_color: [u8; 4],
}

impl Default for DecalConfig {
    fn default() -> Self {
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            occlusion_size: DEFAULT_OCCLUSION_SIZE,
            backoff_distance: PROJECTOR_BACKOFF_DISTANCE,
            projector_near: PROJECTOR_NEAR,
            projector_far: PROJECTOR_FAR,
            depth_bias: 0.0005,
            base_color: [178, 178, 178, 255],
            clear_color: [0, 0, 0, 255],
        }
    }
}

impl DecalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.canvas_size == 0 || !self.canvas_size.is_power_of_two() {
            return Err(DecalError::InvalidConfig(format!(
                "canvas size {} is not a power of two",
                self.canvas_size
            )));
        }
        if self.occlusion_size == 0 {
            return Err(DecalError::InvalidConfig(
                "occlusion map size must be non-zero".into(),
            ));
        }
        if !(self.backoff_distance > 0.0) {
            return Err(DecalError::InvalidConfig(format!(
                "backoff distance {} must be positive",
                self.backoff_distance
            )));
        }
        if !(self.projector_near > 0.0 && self.projector_far > self.projector_near) {
            return Err(DecalError::InvalidConfig(format!(
                "projector depth range {}..{} is empty",
                self.projector_near, self.projector_far
            )));
        }
        if !(self.depth_bias >= 0.0) {
            return Err(DecalError::InvalidConfig(format!(
                "depth bias {} must be non-negative",
                self.depth_bias
            )));
        }
        Ok(())
    }

    /// Number of levels in the canvas mip chain, down to 1x1.
    pub fn canvas_mip_levels(&self) -> u32 {
        self.canvas_size.max(1).ilog2() + 1
    }

    pub fn base_color_f32(&self) -> [f32; 4] {
        self.base_color.map(|c| c as f32 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = DecalConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.canvas_mip_levels(), 13);
    }

    #[test]
    fn non_power_of_two_canvas_is_rejected() {
        let cfg = DecalConfig {
            canvas_size: 1000,
            ..DecalConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DecalError::InvalidConfig(_))));
    }

    #[test]
    fn inverted_depth_range_is_rejected() {
        let cfg = DecalConfig {
            projector_near: 5.0,
            projector_far: 1.0,
            ..DecalConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
