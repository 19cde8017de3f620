//! Interactive viewer for texture-space decals.
//!
//! Loads an OBJ mesh and a folder of decal images, then stamps decals into
//! the mesh's albedo canvas on the GPU wherever the user clicks.

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod renderer;
pub mod ui;
