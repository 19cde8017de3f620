use crate::canvas::Rgba8;
use crate::error::{DecalError, Result};

/// Straight-alpha RGBA8 image stamped by the projector. Row 0 is the top of
/// the image.
#[derive(Clone, Debug)]
pub struct DecalImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl DecalImage {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba8>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return Err(DecalError::InvalidDecalImage {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image from tightly packed RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(DecalError::InvalidDecalImage {
                width,
                height,
                len: bytes.len() / 4,
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn solid(width: u32, height: u32, color: Rgba8) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![color; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGBA8 rows, top row first.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Height over width; scales the projector's half-height.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }

    #[inline]
    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.pixels[y * self.width as usize + x].map(|c| c as f32 / 255.0)
    }

    /// Bilinear, clamp-to-edge sample at `(u, v)`, channels in [0, 1].
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let t00 = self.texel(x0, y0);
        let t10 = self.texel(x0 + 1, y0);
        let t01 = self.texel(x0, y0 + 1);
        let t11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for c in 0..4 {
            let top = t00[c] + (t10[c] - t00[c]) * fx;
            let bottom = t01[c] + (t11[c] - t01[c]) * fx;
            out[c] = top + (bottom - top) * fy;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_pixel_count() {
        assert!(DecalImage::new(2, 2, vec![[0; 4]; 3]).is_err());
        assert!(DecalImage::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn bilinear_blends_neighbours_and_clamps() {
        let img = DecalImage::new(2, 1, vec![[0, 0, 0, 255], [255, 0, 0, 255]]).unwrap();
        assert_eq!(img.sample(0.5, 0.5)[0], 0.5);
        assert_eq!(img.sample(0.0, 0.5)[0], 0.0);
        assert_eq!(img.sample(1.0, 0.5)[0], 1.0);
        assert_eq!(img.aspect(), 0.5);
    }

    #[test]
    fn solid_is_uniform() {
        let img = DecalImage::solid(3, 5, [255, 0, 0, 128]);
        let s = img.sample(0.37, 0.81);
        assert_eq!(s[0], 1.0);
        assert!((s[3] - 128.0 / 255.0).abs() < 1e-6);
    }
}
