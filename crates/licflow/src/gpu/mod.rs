//! `wgpu` rendition of the pass chain.
//!
//! - `context` opens a headless adapter and device.
//! - `textures` uploads inputs, allocates render targets and reads them back.
//! - `pipeline` turns a compiled program into a render pipeline whose texture
//!   bind group follows the program's declared samplers.
//! - `uniforms` packs resolved uniform values into the shared `FlowParams` block.
//! - `state` owns everything and runs one frame per `render_frame` call.

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub use context::GpuContext;
pub use state::GpuFlowRenderer;
pub use uniforms::FlowUniforms;
