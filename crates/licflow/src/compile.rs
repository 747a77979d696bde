//! Program compilation.
//!
//! Both compilers parse each stage with naga's GLSL frontend and validate the
//! resulting module first, so compile and link failures surface as typed
//! [`ProgramError`]s before any device is touched. [`DeviceCompiler`] then
//! hands the same sources to `wgpu`.

use std::borrow::Cow;
use std::collections::BTreeSet;

use wgpu::naga;

use crate::error::ProgramError;
use crate::programs::{ProgramCompiler, ProgramName, ProgramSource, ShaderStage};

/// Parsed and validated naga modules for both stages of a program.
#[derive(Debug)]
pub struct ValidatedProgram {
    pub name: ProgramName,
    pub vertex: naga::Module,
    pub fragment: naga::Module,
}

/// Compiler that only parses and validates; needs no GPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaderValidator;

impl ProgramCompiler for ShaderValidator {
    type Program = ValidatedProgram;

    fn compile(&self, source: &ProgramSource) -> Result<Self::Program, ProgramError> {
        validate_program(source)
    }
}

/// Parses, validates and links both stages of `source`.
pub fn validate_program(source: &ProgramSource) -> Result<ValidatedProgram, ProgramError> {
    let vertex = compile_stage(source, ShaderStage::Vertex)?;
    let fragment = compile_stage(source, ShaderStage::Fragment)?;
    link(source, &vertex, &fragment)?;
    Ok(ValidatedProgram {
        name: source.name,
        vertex,
        fragment,
    })
}

fn compile_stage(source: &ProgramSource, stage: ShaderStage) -> Result<naga::Module, ProgramError> {
    let text = source.stage(stage);
    let compile_error = |message: String| ProgramError::Compile {
        program: source.name.to_string(),
        stage,
        message,
    };

    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga::ShaderStage::from(stage));
    let module = frontend
        .parse(&options, text)
        .map_err(|err| compile_error(err.to_string()))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| compile_error(err.to_string()))?;
    Ok(module)
}

fn link(
    source: &ProgramSource,
    vertex: &naga::Module,
    fragment: &naga::Module,
) -> Result<(), ProgramError> {
    let link_error = |message: String| ProgramError::Link {
        program: source.name.to_string(),
        message,
    };

    let vertex_entry = entry_point(vertex, naga::ShaderStage::Vertex)
        .ok_or_else(|| link_error("vertex stage has no main entry point".into()))?;
    let fragment_entry = entry_point(fragment, naga::ShaderStage::Fragment)
        .ok_or_else(|| link_error("fragment stage has no main entry point".into()))?;

    let mut attribute_locations = BTreeSet::new();
    for argument in &vertex_entry.function.arguments {
        collect_locations(vertex, argument.ty, argument.binding.as_ref(), &mut attribute_locations);
    }
    for attribute in &source.attributes {
        if !attribute_locations.contains(&attribute.location) {
            return Err(link_error(format!(
                "attribute '{}' at location {} is not read by the vertex stage",
                attribute.name, attribute.location
            )));
        }
    }

    let mut produced = BTreeSet::new();
    if let Some(result) = &vertex_entry.function.result {
        collect_locations(vertex, result.ty, result.binding.as_ref(), &mut produced);
    }
    let mut consumed = BTreeSet::new();
    for argument in &fragment_entry.function.arguments {
        collect_locations(fragment, argument.ty, argument.binding.as_ref(), &mut consumed);
    }
    if let Some(missing) = consumed.difference(&produced).next() {
        return Err(link_error(format!(
            "fragment input at location {missing} is not written by the vertex stage"
        )));
    }

    let globals: BTreeSet<&str> = fragment
        .global_variables
        .iter()
        .filter_map(|(_, global)| global.name.as_deref())
        .collect();
    for sampler in source.samplers() {
        for prefix in ["tex_", "samp_"] {
            let expected = format!("{prefix}{}", sampler.name);
            if !globals.contains(expected.as_str()) {
                return Err(link_error(format!(
                    "sampler uniform '{}' is declared but '{expected}' is missing from the fragment stage",
                    sampler.name
                )));
            }
        }
    }

    let members = params_members(fragment);
    for value in source.values() {
        if !members.contains(value.name) {
            return Err(link_error(format!(
                "uniform '{}' is declared but missing from the FlowParams block",
                value.name
            )));
        }
    }
    Ok(())
}

fn entry_point(module: &naga::Module, stage: naga::ShaderStage) -> Option<&naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage && entry.name == "main")
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Member names of the uniform block bound at set 0, binding 0.
fn params_members(module: &naga::Module) -> BTreeSet<&str> {
    let block = module.global_variables.iter().find(|(_, global)| {
        matches!(
            global.binding,
            Some(naga::ResourceBinding { group: 0, binding: 0 })
        )
    });
    let Some((_, global)) = block else {
        return BTreeSet::new();
    };
    match &module.types[global.ty].inner {
        naga::TypeInner::Struct { members, .. } => members
            .iter()
            .filter_map(|member| member.name.as_deref())
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Shader modules for one program, created on a live device.
#[derive(Debug)]
pub struct GpuProgram {
    pub source: ProgramSource,
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Validates with naga, then creates `wgpu` shader modules.
pub struct DeviceCompiler<'a> {
    device: &'a wgpu::Device,
}

impl<'a> DeviceCompiler<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    fn create_module(
        &self,
        source: &ProgramSource,
        stage: ShaderStage,
    ) -> Result<wgpu::ShaderModule, ProgramError> {
        let label = format!("{} {stage}", source.name);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(source.stage(stage).to_string()),
                stage: stage.into(),
                defines: &[],
            },
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ProgramError::Compile {
                program: source.name.to_string(),
                stage,
                message: err.to_string(),
            });
        }
        Ok(module)
    }
}

impl ProgramCompiler for DeviceCompiler<'_> {
    type Program = GpuProgram;

    fn compile(&self, source: &ProgramSource) -> Result<Self::Program, ProgramError> {
        validate_program(source)?;
        let vertex = self.create_module(source, ShaderStage::Vertex)?;
        let fragment = self.create_module(source, ShaderStage::Fragment)?;
        tracing::debug!(program = %source.name, "created shader modules");
        Ok(GpuProgram {
            source: source.clone(),
            vertex,
            fragment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{ProgramTable, UniformDecl};
    use crate::types::PipelineSettings;

    fn table() -> ProgramTable {
        ProgramTable::new(&PipelineSettings::default())
    }

    #[test]
    fn every_program_validates() {
        for source in table().iter() {
            if let Err(err) = validate_program(source) {
                panic!("{err}");
            }
        }
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let mut source = table().get(ProgramName::Blend).clone();
        source.fragment = source.fragment.replace("fragColor = lic", "fragColor = = lic");
        let err = validate_program(&source).unwrap_err();
        match err {
            ProgramError::Compile { program, stage, .. } => {
                assert_eq!(program, "blend");
                assert_eq!(stage, ShaderStage::Fragment);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmatched_fragment_input_is_a_link_error() {
        let mut source = table().get(ProgramName::Advection).clone();
        source.vertex = source.vertex.replace(
            "layout(location = 0) out vec2 vTexCoord;",
            "layout(location = 3) out vec2 vTexCoord;",
        );
        let err = validate_program(&source).unwrap_err();
        assert!(matches!(err, ProgramError::Link { .. }), "{err}");
    }

    #[test]
    fn undeclared_sampler_is_a_link_error() {
        let mut source = table().get(ProgramName::OrthogonalLic).clone();
        source.uniforms.push(UniformDecl::sampler("missingTexture"));
        let err = validate_program(&source).unwrap_err();
        assert!(
            matches!(err, ProgramError::Link { ref message, .. } if message.contains("missingTexture")),
            "{err}"
        );
    }
}
