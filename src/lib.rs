//! Vertex animation texture baker.
//!
//! Samples skinned clips frame by frame, packs the per-vertex positions and
//! normals into a linear buffer, and rearranges them into half-float
//! textures (x = vertex, y = frame) for shader-driven playback.

pub mod app;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod scene;

pub use crate::core::error::{BakeError, Result};
