//! Deterministic CPU implementation of [`DecalBackend`].

use crate::backend::{DecalBackend, StampJob};
use crate::canvas::{AlbedoCanvas, Rgba8};
use crate::compositor::{self, StampContext};
use crate::config::DecalConfig;
use crate::decal::DecalImage;
use crate::error::{DecalError, Result};
use crate::mesh::Mesh;
use crate::occlusion::OcclusionMap;
use crate::raster::Coverage;
use glam::Mat4;
use std::sync::Arc;

pub struct SoftwareBackend {
    mesh: Arc<Mesh>,
    canvas: AlbedoCanvas,
    occlusion: OcclusionMap,
    decals: Vec<DecalImage>,
    base_color: Rgba8,
    clear_color: Rgba8,
    conservative_supported: bool,
}

impl SoftwareBackend {
    pub fn new(mesh: Arc<Mesh>, decals: Vec<DecalImage>, config: &DecalConfig) -> Result<Self> {
        config.validate()?;
        if decals.is_empty() {
            return Err(DecalError::EmptyCatalog);
        }
        Ok(Self {
            mesh,
            canvas: AlbedoCanvas::new(config.canvas_size, config.clear_color),
            occlusion: OcclusionMap::new(config.occlusion_size),
            decals,
            base_color: config.base_color,
            clear_color: config.clear_color,
            conservative_supported: true,
        })
    }

    /// Pretends the capability is missing, forcing standard coverage.
    pub fn without_conservative(mut self) -> Self {
        self.conservative_supported = false;
        self
    }

    pub fn canvas(&self) -> &AlbedoCanvas {
        &self.canvas
    }

    pub fn occlusion(&self) -> &OcclusionMap {
        &self.occlusion
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    fn coverage(&self, conservative: bool) -> Coverage {
        if conservative && self.conservative_supported {
            Coverage::Conservative
        } else {
            Coverage::Standard
        }
    }
}

impl DecalBackend for SoftwareBackend {
    fn supports_conservative(&self) -> bool {
        self.conservative_supported
    }

    fn decal_count(&self) -> usize {
        self.decals.len()
    }

    fn decal_extent(&self, index: usize) -> Option<(u32, u32)> {
        self.decals.get(index).map(|d| (d.width(), d.height()))
    }

    fn initialize_canvas(&mut self, conservative: bool) -> Result<()> {
        let coverage = self.coverage(conservative);
        compositor::initialize(
            &mut self.canvas,
            &self.mesh,
            self.base_color,
            self.clear_color,
            coverage,
        );
        Ok(())
    }

    fn render_occlusion(&mut self, light_view_proj: Mat4) -> Result<()> {
        self.occlusion.render(&self.mesh, light_view_proj);
        Ok(())
    }

    fn stamp(&mut self, job: &StampJob) -> Result<()> {
        let coverage = self.coverage(job.conservative);
        let decal = self
            .decals
            .get(job.decal_index)
            .ok_or(DecalError::DecalIndexOutOfRange {
                index: job.decal_index,
                count: self.decals.len(),
            })?;
        let ctx = StampContext {
            light_view_proj: job.light_view_proj,
            occlusion: &self.occlusion,
            decal,
            depth_bias: job.depth_bias,
        };
        let written = compositor::stamp(&mut self.canvas, &self.mesh, &ctx, coverage);
        log::debug!("Stamped decal {} into {} texels", job.decal_index, written);
        Ok(())
    }

    fn generate_mips(&mut self) -> Result<()> {
        self.canvas.generate_mips();
        Ok(())
    }
}
