//! Animated line-integral-convolution view of ocean currents.
//!
//! Every frame runs five passes over a packed ocean-current field:
//!
//! ```text
//!   noise ──▶ noiseTransport ──▶ orthogonalLic ──┐
//!                                                ├─▶ blend ──▶ blended[next]
//!   blended[current] ──▶ advection ──────────────┘        │
//!                                                         ▼
//!                                          globe (masked flow over earth)
//! ```
//!
//! The passes exist twice: as GLSL programs served by a [`ProgramRegistry`]
//! and run on `wgpu` by [`GpuFlowRenderer`], and as pure per-texel kernels run
//! by [`CpuFlowPipeline`]. Both read their constants from one
//! [`PipelineSettings`] value.

pub mod bindings;
pub mod compile;
pub mod error;
pub mod field;
pub mod frame;
pub mod globe;
pub mod gpu;
pub mod inputs;
pub mod kernels;
pub mod passes;
pub mod programs;
pub mod runtime;
pub mod texture;
pub mod types;

pub use bindings::UniformBindings;
pub use compile::{DeviceCompiler, GpuProgram, ShaderValidator, ValidatedProgram};
pub use error::ProgramError;
pub use field::VectorField;
pub use frame::CpuFlowPipeline;
pub use globe::{Camera, SphereMesh};
pub use gpu::{GpuContext, GpuFlowRenderer};
pub use inputs::FlowInputs;
pub use passes::PipelinePasses;
pub use programs::{
    ProgramCompiler, ProgramName, ProgramRegistry, ProgramSource, ProgramTable, ShaderStage,
    UniformValue,
};
pub use runtime::{
    drive, offset_source_for, BoxedOffsetSource, FixedOffsetSource, FrameRenderer, FrameStats,
    OffsetSource, SeededOffsetSource,
};
pub use texture::{Sample, Texture};
pub use types::{
    AddressMode, BlendWeights, Filter, Integration, MaskParams, PipelineSettings, Resolution,
};
