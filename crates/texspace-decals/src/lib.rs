//! Texture-space decals: paints projected images permanently into a mesh's
//! UV-space albedo canvas.
//!
//! One decal-apply cycle:
//!   1. pick     : screen pixel -> world ray -> nearest triangle hit
//!   2. project  : orthographic projector backed off the hit along its normal
//!   3. occlude  : depth-only render of the mesh from the projector
//!   4. stamp    : rasterize the mesh unfolded into UV space; every fragment
//!                 inside the projector volume and not occluded blends the
//!                 decal over the canvas
//!   5. mips     : rebuild the canvas mip chain
//!
//! [`DecalSystem`] drives the cycle over any [`DecalBackend`]. The
//! [`SoftwareBackend`] here is the deterministic CPU rendition; a GPU backend
//! lives with the viewer.

pub mod backend;
pub mod canvas;
pub mod command;
pub mod compositor;
pub mod config;
pub mod decal;
pub mod error;
pub mod gizmo;
pub mod intersect;
pub mod mesh;
pub mod occlusion;
pub mod params;
pub mod picker;
pub mod projector;
pub mod raster;
pub mod software;
pub mod system;
pub mod uniforms;

pub use backend::{DecalBackend, StampJob};
pub use canvas::{AlbedoCanvas, Rgba8};
pub use command::ApplySlot;
pub use config::DecalConfig;
pub use decal::DecalImage;
pub use error::{DecalError, Result};
pub use intersect::{Bvh, Intersector, Ray, TriangleHit};
pub use mesh::{Mesh, SubMesh, Vertex};
pub use occlusion::OcclusionMap;
pub use params::{DecalParams, DecalSettings, ParamGenerator, RandomParams};
pub use picker::HitRecord;
pub use projector::Projector;
pub use raster::Coverage;
pub use software::SoftwareBackend;
pub use system::{CyclePhase, DecalSystem};
pub use uniforms::GlobalFrameUniforms;
