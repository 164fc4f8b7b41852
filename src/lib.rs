//! parallax-ngin
//!
//! A small real-time 3D scene renderer. It loads meshes and textures named
//! by a [`scene::description::SceneDescription`] and draws them every frame
//! with parallax mapping, a spot light shadow map and a render-to-texture
//! portal, under keyboard control.
//!
//! High-level modules
//! - `input`: per-key state table and mouse position
//! - `timer`: stopwatch producing the frame delta
//! - `colour`: RGB/HSL conversion used by animated lights
//! - `camera`: camera state, derived matrices and the view uniform
//! - `context`: window, surface and GPU device
//! - `data_structures`: models, lights, textures, transforms, vertex layouts
//! - `pipelines`: rendering techniques and their shaders
//! - `resources`: asset loading (OBJ meshes, images)
//! - `scene`: scene description, per-frame update and the render passes
//! - `flow`: window creation and the frame loop
//!

pub mod camera;
pub mod colour;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod resources;
pub mod scene;
pub mod timer;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
