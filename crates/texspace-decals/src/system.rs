//! The decal-apply state machine, owned by the caller as one context value.

use crate::backend::{DecalBackend, StampJob};
use crate::command::ApplySlot;
use crate::config::DecalConfig;
use crate::error::{DecalError, Result};
use crate::intersect::Bvh;
use crate::mesh::Mesh;
use crate::params::{DecalParams, DecalSettings, ParamGenerator};
use crate::picker::{self, HitRecord};
use crate::projector::Projector;
use crate::uniforms::GlobalFrameUniforms;
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// Where the current decal-apply cycle stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    /// A projector is built and a stamp is pending.
    ProjectorReady,
    DepthRendered,
    Stamped,
}

#[derive(Clone, Copy, Debug)]
struct StampRequest {
    projector: Projector,
    decal_index: usize,
}

pub const CONSERVATIVE_UNSUPPORTED_NOTE: &str =
    "Note: Conservative Rasterization not supported on this GPU.";

/// Decal pipeline for one mesh instance.
///
/// Fields drop in declaration order: the intersector goes before the backend,
/// and the backend (canvas, occlusion map) must be dropped by the caller
/// before its rendering context.
pub struct DecalSystem<B: DecalBackend> {
    intersector: Bvh,
    backend: B,
    mesh: Arc<Mesh>,
    config: DecalConfig,
    settings: DecalSettings,
    params: DecalParams,
    generator: Option<Box<dyn ParamGenerator>>,
    pending: ApplySlot<StampRequest>,
    last_hit: HitRecord,
    projector: Option<Projector>,
    phase: CyclePhase,
}

impl<B: DecalBackend> DecalSystem<B> {
    /// Builds the intersector and runs the initialize pass once.
    pub fn new(mesh: Arc<Mesh>, backend: B, config: DecalConfig) -> Result<Self> {
        config.validate()?;
        if backend.decal_count() == 0 {
            return Err(DecalError::EmptyCatalog);
        }

        let intersector = Bvh::from_mesh(&mesh)?;

        let mut system = Self {
            intersector,
            backend,
            mesh,
            config,
            settings: DecalSettings::default(),
            params: DecalParams::default(),
            generator: None,
            pending: ApplySlot::new(),
            last_hit: HitRecord::MISS,
            projector: None,
            phase: CyclePhase::Idle,
        };

        if system.settings.conservative_rasterization && !system.backend.supports_conservative() {
            log::warn!("Conservative rasterization unavailable; falling back to standard coverage");
        }

        system.initialize_canvas()?;
        log::info!(
            "Decal system ready: {} triangles, {}x{} canvas, {} decals",
            system.mesh.triangle_count(),
            system.config.canvas_size,
            system.config.canvas_size,
            system.backend.decal_count()
        );
        Ok(system)
    }

    /// Installs the strategy consulted on each pick while
    /// `randomize_on_pick` is set.
    pub fn with_generator(mut self, generator: Box<dyn ParamGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn set_generator(&mut self, generator: Option<Box<dyn ParamGenerator>>) {
        self.generator = generator;
    }

    fn conservative(&self) -> bool {
        self.settings.conservative_rasterization && self.backend.supports_conservative()
    }

    fn initialize_canvas(&mut self) -> Result<()> {
        let conservative = self.conservative();
        self.backend.initialize_canvas(conservative)?;
        self.backend.generate_mips()
    }

    /// Picks along a world-space ray. A miss leaves every piece of state as
    /// it was.
    pub fn pick_ray(&mut self, origin: Vec3, direction: Vec3) -> HitRecord {
        let hit = picker::pick(&self.intersector, origin, direction);
        if !hit.is_hit() {
            log::debug!("Pick missed the mesh");
            return hit;
        }

        self.last_hit = hit;
        if self.settings.randomize_on_pick {
            if let Some(generator) = self.generator.as_mut() {
                let count = self.backend.decal_count();
                self.params = generator.generate(&self.params, count).clamped(count);
            }
        }
        self.request_stamp();
        hit
    }

    /// Picks through pixel `(px, py)` of a `width` x `height` viewport.
    pub fn pick_screen(
        &mut self,
        px: f32,
        py: f32,
        width: f32,
        height: f32,
        view: Mat4,
        proj: Mat4,
    ) -> HitRecord {
        match picker::screen_ray(px, py, width, height, view, proj) {
            Some(ray) => self.pick_ray(ray.origin, ray.direction),
            None => HitRecord::MISS,
        }
    }

    /// Replaces the decal parameters, clamped to their ranges. While a valid
    /// hit exists a change re-triggers a stamp at that hit.
    pub fn set_params(&mut self, params: DecalParams) {
        let params = params.clamped(self.backend.decal_count());
        if params == self.params {
            return;
        }
        self.params = params;
        if self.last_hit.is_hit() {
            self.request_stamp();
        }
    }

    fn request_stamp(&mut self) {
        let (w, h) = match self.backend.decal_extent(self.params.decal_index) {
            Some(extent) => extent,
            None => return,
        };
        let aspect = h as f32 / w.max(1) as f32;

        let Some(projector) = Projector::build(
            &self.last_hit,
            self.params.half_width,
            self.params.rotation_degrees,
            aspect,
            &self.config,
        ) else {
            return;
        };

        self.projector = Some(projector);
        let displaced = self.pending.submit(StampRequest {
            projector,
            decal_index: self.params.decal_index,
        });
        if displaced.is_some() {
            log::debug!("Pending stamp replaced before it ran");
        }
        self.phase = CyclePhase::ProjectorReady;
    }

    /// Runs the pending cycle, if any: occlusion, stamp, mip regeneration.
    /// Returns whether a stamp happened.
    pub fn update(&mut self) -> Result<bool> {
        let Some(request) = self.pending.take() else {
            return Ok(false);
        };

        let light_view_proj = request.projector.light_view_proj();
        let result = self.run_cycle(light_view_proj, request.decal_index);
        self.phase = CyclePhase::Idle;
        result?;

        log::info!(
            "Decal {} applied at ({:.2}, {:.2}, {:.2})",
            request.decal_index,
            request.projector.target.x,
            request.projector.target.y,
            request.projector.target.z
        );
        Ok(true)
    }

    fn run_cycle(&mut self, light_view_proj: Mat4, decal_index: usize) -> Result<()> {
        self.backend.render_occlusion(light_view_proj)?;
        self.phase = CyclePhase::DepthRendered;

        self.backend.stamp(&StampJob {
            light_view_proj,
            decal_index,
            conservative: self.conservative(),
            depth_bias: self.config.depth_bias,
        })?;
        self.phase = CyclePhase::Stamped;

        self.backend.generate_mips()
    }

    /// Discards every stamp by re-running the initialize pass.
    pub fn clear_canvas(&mut self) -> Result<()> {
        self.initialize_canvas()?;
        log::info!("Canvas cleared");
        Ok(())
    }

    pub fn params(&self) -> &DecalParams {
        &self.params
    }

    pub fn settings(&self) -> &DecalSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut DecalSettings {
        &mut self.settings
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Most recent successful pick; [`HitRecord::MISS`] until the first one.
    pub fn last_hit(&self) -> &HitRecord {
        &self.last_hit
    }

    pub fn projector(&self) -> Option<&Projector> {
        self.projector.as_ref()
    }

    pub fn light_view_proj(&self) -> Mat4 {
        self.projector
            .map(|p| p.light_view_proj())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn frame_uniforms(&self, view_proj: Mat4, cam_pos: Vec3) -> GlobalFrameUniforms {
        GlobalFrameUniforms::new(view_proj, self.light_view_proj(), cam_pos)
    }

    /// Advisory text for the UI when conservative coverage is unavailable.
    pub fn conservative_note(&self) -> Option<&'static str> {
        (!self.backend.supports_conservative()).then_some(CONSERVATIVE_UNSUPPORTED_NOTE)
    }

    pub fn decal_count(&self) -> usize {
        self.backend.decal_count()
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn config(&self) -> &DecalConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
