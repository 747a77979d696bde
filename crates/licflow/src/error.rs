use crate::programs::ShaderStage;

/// Failures raised while resolving or building a shader program.
///
/// None of these are transient: they describe a misconfigured program set
/// and the pipeline cannot run until they are fixed.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("unknown program '{0}'; expected one of globe, noiseTransport, orthogonalLic, advection, blend")]
    UnknownProgram(String),
    #[error("failed to compile {stage} stage of program '{program}': {message}")]
    Compile {
        program: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("failed to link program '{program}': {message}")]
    Link { program: String, message: String },
}

impl ProgramError {
    /// True for errors raised while building a program, as opposed to looking it up.
    pub fn is_build_failure(&self) -> bool {
        matches!(self, Self::Compile { .. } | Self::Link { .. })
    }
}
