//! Scene data structures: transforms, models, lights, vertices and textures.
//!
//! - `transform` holds Euler-angle transforms and the facing helpers
//! - `model` contains a positioned mesh and its GPU buffers
//! - `light` describes lights and their colour animation
//! - `vertex` builds per-vertex layouts from the attributes a mesh has
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod light;
pub mod model;
pub mod texture;
pub mod transform;
pub mod vertex;
