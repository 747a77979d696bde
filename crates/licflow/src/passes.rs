//! Typed descriptions of the five per-frame passes.
//!
//! A pass knows which program it runs, which textures and uniforms that
//! program reads, and the constants baked into its source. The CPU pipeline
//! calls [`shade`](NoiseTransportPass::shade) on the same structs the GLSL is
//! generated from, so both paths agree on every parameter.

use glam::{Vec2, Vec4};

use crate::field::VectorField;
use crate::globe::Camera;
use crate::kernels;
use crate::programs::{ProgramName, UniformDecl, UniformValue};
use crate::texture::Sample;
use crate::types::{BlendWeights, Integration, MaskParams, PipelineSettings};

/// Vertex stage a program is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// Full-screen quad fed by `vertexCoord`/`texCoord`.
    Quad,
    /// Sphere mesh fed by `modelCoord`/`texCoord`, projected by the camera matrices.
    Globe,
}

/// Everything needed to generate and bind one program.
#[derive(Debug, Clone)]
pub struct PassContract {
    pub program: ProgramName,
    pub vertex: VertexKind,
    /// Sampler the field helpers (`isWater`, `fieldAt`, ...) read from.
    pub field_sampler: &'static str,
    /// Samplers first, in binding order, then value uniforms.
    pub uniforms: Vec<UniformDecl>,
    /// Compile-time constants injected as `#define`s.
    pub defines: Vec<(&'static str, String)>,
}

fn float(value: f32) -> String {
    // Debug formatting always keeps a decimal point or exponent.
    format!("{value:?}")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseTransportPass {
    pub step: f32,
}

impl NoiseTransportPass {
    pub const PROGRAM: ProgramName = ProgramName::NoiseTransport;

    pub fn contract(&self) -> PassContract {
        PassContract {
            program: Self::PROGRAM,
            vertex: VertexKind::Quad,
            field_sampler: "field",
            uniforms: vec![
                UniformDecl::sampler("field"),
                UniformDecl::sampler("noise"),
                UniformDecl::value("randomOffset", UniformValue::Vec2([0.0, 0.0])),
            ],
            defines: vec![("TRANSPORT_STEP", float(self.step))],
        }
    }

    pub fn shade(&self, field: &VectorField, noise: &impl Sample, coord: Vec2, offset: Vec2) -> Vec4 {
        kernels::noise_transport(field, noise, coord, offset, self.step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthogonalLicPass {
    pub integration: Integration,
}

impl OrthogonalLicPass {
    pub const PROGRAM: ProgramName = ProgramName::OrthogonalLic;

    pub fn contract(&self) -> PassContract {
        PassContract {
            program: Self::PROGRAM,
            vertex: VertexKind::Quad,
            field_sampler: "oceanCurrent",
            uniforms: vec![
                UniformDecl::sampler("oceanCurrent"),
                UniformDecl::sampler("transportedNoise"),
            ],
            defines: vec![
                ("LIC_STEPS", self.integration.steps.to_string()),
                ("LIC_STEP", float(self.integration.step)),
            ],
        }
    }

    pub fn shade(&self, field: &VectorField, transported: &impl Sample, coord: Vec2) -> Vec4 {
        kernels::orthogonal_lic(field, transported, coord, self.integration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvectionPass {
    pub integration: Integration,
}

impl AdvectionPass {
    pub const PROGRAM: ProgramName = ProgramName::Advection;

    pub fn contract(&self) -> PassContract {
        PassContract {
            program: Self::PROGRAM,
            vertex: VertexKind::Quad,
            field_sampler: "oceanCurrent",
            uniforms: vec![
                UniformDecl::sampler("oceanCurrent"),
                UniformDecl::sampler("previousTexture"),
            ],
            defines: vec![
                ("ADVECTION_STEPS", self.integration.steps.to_string()),
                ("ADVECTION_STEP", float(self.integration.step)),
            ],
        }
    }

    pub fn shade(&self, field: &VectorField, previous: &impl Sample, coord: Vec2) -> Vec4 {
        kernels::advection(field, previous, coord, self.integration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendPass {
    pub weights: BlendWeights,
}

impl BlendPass {
    pub const PROGRAM: ProgramName = ProgramName::Blend;

    pub fn contract(&self) -> PassContract {
        PassContract {
            program: Self::PROGRAM,
            vertex: VertexKind::Quad,
            field_sampler: "oceanCurrent",
            uniforms: vec![
                UniformDecl::sampler("orthogonalLIC"),
                UniformDecl::sampler("advected"),
                UniformDecl::sampler("oceanCurrent"),
            ],
            defines: vec![
                ("BLEND_LIC", float(self.weights.lic)),
                ("BLEND_ADVECTED", float(self.weights.advected)),
            ],
        }
    }

    pub fn shade(&self, lic: &impl Sample, advected: &impl Sample, coord: Vec2) -> Vec4 {
        kernels::blend(lic.sample(coord), advected.sample(coord), self.weights)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobePass {
    pub mask: MaskParams,
}

impl GlobePass {
    pub const PROGRAM: ProgramName = ProgramName::Globe;

    pub fn contract(&self) -> PassContract {
        let camera = Camera::default();
        PassContract {
            program: Self::PROGRAM,
            vertex: VertexKind::Globe,
            field_sampler: "oceanCurrent",
            uniforms: vec![
                UniformDecl::sampler("texture"),
                UniformDecl::sampler("oceanCurrent"),
                UniformDecl::sampler("earthTexture"),
                UniformDecl::value(
                    "ModelViewMatrix",
                    UniformValue::Mat4(camera.model_view.to_cols_array_2d()),
                ),
                UniformDecl::value(
                    "ProjectionMatrix",
                    UniformValue::Mat4(camera.projection.to_cols_array_2d()),
                ),
                UniformDecl::value("mask", UniformValue::Int(i32::from(self.mask.enabled))),
                UniformDecl::value("m", UniformValue::Float(self.mask.m)),
                UniformDecl::value("n", UniformValue::Float(self.mask.n)),
            ],
            defines: vec![("MAGNITUDE_CEILING", float(crate::types::MAGNITUDE_CEILING))],
        }
    }

    /// Fragment colour at a texture coordinate of the sphere.
    pub fn shade(
        &self,
        field: &VectorField,
        flow: &impl Sample,
        earth: &impl Sample,
        coord: Vec2,
    ) -> Vec4 {
        kernels::globe(field, flow, earth, coord, self.mask)
    }
}

/// The full per-frame pass set for one settings value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelinePasses {
    pub noise_transport: NoiseTransportPass,
    pub orthogonal_lic: OrthogonalLicPass,
    pub advection: AdvectionPass,
    pub blend: BlendPass,
    pub globe: GlobePass,
}

impl PipelinePasses {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            noise_transport: NoiseTransportPass {
                step: settings.noise_transport_step,
            },
            orthogonal_lic: OrthogonalLicPass {
                integration: settings.lic,
            },
            advection: AdvectionPass {
                integration: settings.advection,
            },
            blend: BlendPass {
                weights: settings.blend,
            },
            globe: GlobePass {
                mask: settings.mask,
            },
        }
    }

    pub fn contract(&self, name: ProgramName) -> PassContract {
        match name {
            ProgramName::NoiseTransport => self.noise_transport.contract(),
            ProgramName::OrthogonalLic => self.orthogonal_lic.contract(),
            ProgramName::Advection => self.advection.contract(),
            ProgramName::Blend => self.blend.contract(),
            ProgramName::Globe => self.globe.contract(),
        }
    }
}
