//! CPU-resident albedo canvas addressed by mesh UV, with its mip chain.

use rayon::prelude::*;

pub type Rgba8 = [u8; 4];

/// Square RGBA8 texture plus a full mip chain down to 1x1.
///
/// Texel `(x, y)` of level 0 has its centre at UV `((x + 0.5) / N, (y + 0.5) / N)`.
#[derive(Clone, Debug)]
pub struct AlbedoCanvas {
    size: u32,
    levels: Vec<Vec<Rgba8>>,
}

impl AlbedoCanvas {
    /// `size` must be a power of two; [`crate::DecalConfig::validate`] checks this.
    pub fn new(size: u32, fill: Rgba8) -> Self {
        let count = size.max(1).ilog2() + 1;
        let levels = (0..count)
            .map(|l| {
                let s = (size >> l).max(1) as usize;
                vec![fill; s * s]
            })
            .collect();
        Self { size, levels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level_size(&self, level: u32) -> u32 {
        (self.size >> level).max(1)
    }

    pub fn level(&self, level: u32) -> &[Rgba8] {
        &self.levels[level as usize]
    }

    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> Rgba8 {
        self.levels[0][(y * self.size + x) as usize]
    }

    #[inline]
    pub fn texel_mut(&mut self, x: u32, y: u32) -> &mut Rgba8 {
        &mut self.levels[0][(y * self.size + x) as usize]
    }

    /// Nearest level-0 texel for a UV in [0, 1]².
    pub fn texel_at_uv(&self, u: f32, v: f32) -> Rgba8 {
        let n = self.size as f32;
        let x = (u * n).floor().clamp(0.0, n - 1.0) as u32;
        let y = (v * n).floor().clamp(0.0, n - 1.0) as u32;
        self.texel(x, y)
    }

    /// Level 0 as tightly packed RGBA8 bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.levels[0])
    }

    /// Fills every level with `color`.
    pub fn fill(&mut self, color: Rgba8) {
        for level in &mut self.levels {
            level.fill(color);
        }
    }

    /// Rebuilds levels 1.. from level 0 with a 2x2 box filter.
    pub fn generate_mips(&mut self) {
        for l in 1..self.levels.len() {
            let src_size = self.level_size(l as u32 - 1) as usize;
            let dst_size = self.level_size(l as u32) as usize;
            let (head, tail) = self.levels.split_at_mut(l);
            let src = &head[l - 1];
            let dst = &mut tail[0];

            dst.par_chunks_mut(dst_size)
                .enumerate()
                .for_each(|(y, row)| {
                    let r0 = &src[(2 * y) * src_size..(2 * y + 1) * src_size];
                    let r1 = &src[(2 * y + 1) * src_size..(2 * y + 2) * src_size];
                    for (x, out) in row.iter_mut().enumerate() {
                        let quad = [r0[2 * x], r0[2 * x + 1], r1[2 * x], r1[2 * x + 1]];
                        for c in 0..4 {
                            let sum: u32 = quad.iter().map(|t| t[c] as u32).sum();
                            out[c] = ((sum + 2) / 4) as u8;
                        }
                    }
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_halves_to_one() {
        let canvas = AlbedoCanvas::new(64, [0, 0, 0, 255]);
        assert_eq!(canvas.level_count(), 7);
        assert_eq!(canvas.level(6).len(), 1);
        assert_eq!(canvas.level(1).len(), 32 * 32);
    }

    #[test]
    fn mips_average_two_by_two() {
        let mut canvas = AlbedoCanvas::new(4, [0, 0, 0, 255]);
        *canvas.texel_mut(0, 0) = [255, 0, 0, 255];
        *canvas.texel_mut(1, 0) = [255, 0, 0, 255];
        *canvas.texel_mut(2, 2) = [0, 100, 0, 255];
        canvas.generate_mips();

        assert_eq!(canvas.level(1)[0], [128, 0, 0, 255]);
        assert_eq!(canvas.level(1)[3], [0, 25, 0, 255]);
        assert_eq!(canvas.level(2)[0], [32, 6, 0, 255]);
    }

    #[test]
    fn uv_lookup_uses_texel_centres() {
        let mut canvas = AlbedoCanvas::new(8, [0; 4]);
        *canvas.texel_mut(3, 5) = [9, 9, 9, 9];
        assert_eq!(canvas.texel_at_uv(3.5 / 8.0, 5.5 / 8.0), [9, 9, 9, 9]);
        assert_eq!(canvas.texel_at_uv(1.0, 1.0), [0; 4]);
        assert_eq!(canvas.as_bytes().len(), 8 * 8 * 4);
    }
}
