//! Error type shared by every stage of the decal pipeline.
//!
//! A ray that misses the mesh is not represented here: it is an ordinary
//! outcome carried by [`crate::HitRecord::MISS`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecalError {
    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("submesh {submesh} has an index count ({count}) that is not a multiple of 3")]
    RaggedIndices { submesh: usize, count: u32 },

    #[error("submesh {submesh} references indices {start}..{end} but the index buffer holds {len}")]
    SubmeshOutOfRange {
        submesh: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("triangle vertex {index} is out of range ({vertex_count} vertices)")]
    VertexOutOfRange { index: usize, vertex_count: usize },

    #[error("vertex {vertex} has UV ({u}, {v}) outside [0, 1]")]
    UvOutOfRange { vertex: usize, u: f32, v: f32 },

    #[error("vertex {vertex} has a non-finite position")]
    NonFinitePosition { vertex: usize },

    #[error("decal image {width}x{height} holds {len} pixels")]
    InvalidDecalImage { width: u32, height: u32, len: usize },

    #[error("decal index {index} is out of range (catalog holds {count})")]
    DecalIndexOutOfRange { index: usize, count: usize },

    #[error("decal catalog is empty")]
    EmptyCatalog,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, DecalError>;
