//! The seam between the decal state machine and whatever owns the canvas,
//! occlusion map and decal images.

use crate::error::Result;
use glam::Mat4;

/// One stamp, fully resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StampJob {
    pub light_view_proj: Mat4,
    pub decal_index: usize,
    pub conservative: bool,
    pub depth_bias: f32,
}

/// Storage and passes for one mesh's albedo canvas.
///
/// Calls arrive in cycle order: `render_occlusion`, then `stamp`, then
/// `generate_mips`. `initialize_canvas` runs at startup and on clear.
pub trait DecalBackend {
    /// Whether coverage can be made conservative. When `false`, requests for
    /// conservative coverage fall back to standard rasterization.
    fn supports_conservative(&self) -> bool;

    fn decal_count(&self) -> usize;

    /// `(width, height)` of a catalog image.
    fn decal_extent(&self, index: usize) -> Option<(u32, u32)>;

    /// Pass A: clear, then paint every covered texel with the base color.
    fn initialize_canvas(&mut self, conservative: bool) -> Result<()>;

    /// Depth-only render of the mesh from the projector into the occlusion map.
    fn render_occlusion(&mut self, light_view_proj: Mat4) -> Result<()>;

    /// Pass B: blend the decal into every visible covered texel.
    fn stamp(&mut self, job: &StampJob) -> Result<()>;

    fn generate_mips(&mut self) -> Result<()>;
}
