use glam::Vec2;

/// Width of the packed ocean-current texture the passes were tuned for.
pub const FIELD_WIDTH: u32 = 1024;
/// Height of the packed ocean-current texture the passes were tuned for.
pub const FIELD_HEIGHT: u32 = 512;

/// Step length (in texels) used when jittering noise along the field.
pub const NOISE_TRANSPORT_STEP: f32 = 10.0;
/// Euler steps taken in each direction by the orthogonal LIC pass.
pub const LIC_STEPS: u32 = 25;
/// Step length (in texels) of one LIC Euler step.
pub const LIC_STEP: f32 = 0.75;
/// Euler steps taken backward along the field by the advection pass.
pub const ADVECTION_STEPS: u32 = 35;
/// Step length (in texels) of one advection Euler step.
pub const ADVECTION_STEP: f32 = 0.125;

/// Share of fresh LIC detail mixed into each blended frame.
pub const BLEND_LIC_WEIGHT: f32 = 0.05;
/// Share of the advected history kept in each blended frame.
pub const BLEND_ADVECTED_WEIGHT: f32 = 0.95;

/// Exponent suppressing slow water in the globe mask.
pub const MASK_M: f32 = 10.0;
/// Exponent darkening faint pixels in the globe mask.
pub const MASK_N: f32 = 3.0;
/// Field magnitude at which the masking curve saturates.
pub const MAGNITUDE_CEILING: f32 = 0.5;

/// Texel grid shared by every field lookup in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Resolution as the `size` vector the kernels divide step lengths by.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(FIELD_WIDTH, FIELD_HEIGHT)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed-step Euler integration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration {
    pub steps: u32,
    /// Step length in texels; divided by the resolution before use.
    pub step: f32,
}

/// Linear weights of the blend pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub lic: f32,
    pub advected: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            lic: BLEND_LIC_WEIGHT,
            advected: BLEND_ADVECTED_WEIGHT,
        }
    }
}

/// Magnitude masking applied by the globe pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParams {
    pub enabled: bool,
    /// Exponent of the slow-flow suppression term.
    pub m: f32,
    /// Exponent of the faint-pixel darkening term.
    pub n: f32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            enabled: true,
            m: MASK_M,
            n: MASK_N,
        }
    }
}

/// Texture filtering used by both the CPU sampler and the GPU samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

/// Out-of-range coordinate handling for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Pipeline-wide constants.
///
/// The GLSL sources receive these as `#define`s and the CPU kernels read them
/// directly, so both renderers always run with the same values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub resolution: Resolution,
    pub noise_transport_step: f32,
    pub lic: Integration,
    pub advection: Integration,
    pub blend: BlendWeights,
    pub mask: MaskParams,
    pub filter: Filter,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            noise_transport_step: NOISE_TRANSPORT_STEP,
            lic: Integration {
                steps: LIC_STEPS,
                step: LIC_STEP,
            },
            advection: Integration {
                steps: ADVECTION_STEPS,
                step: ADVECTION_STEP,
            },
            blend: BlendWeights::default(),
            mask: MaskParams::default(),
            filter: Filter::default(),
        }
    }
}

impl PipelineSettings {
    /// Default settings at a different resolution; handy for tests.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            resolution: Resolution::new(width, height),
            ..Self::default()
        }
    }
}
