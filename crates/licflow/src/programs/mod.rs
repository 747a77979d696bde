//! Program registry.
//!
//! A [`ProgramTable`] is the immutable mapping from program name to GLSL
//! source and declared uniforms. A [`ProgramRegistry`] wraps the table with a
//! memo of compiled programs so each program is built at most once per
//! rendering context, on first use.

mod sources;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::error::ProgramError;
use crate::passes::PipelinePasses;
use crate::types::PipelineSettings;

/// The fixed set of programs the pipeline knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgramName {
    Globe,
    NoiseTransport,
    OrthogonalLic,
    Advection,
    Blend,
}

impl ProgramName {
    /// Every program, in per-frame execution order.
    pub const ALL: [ProgramName; 5] = [
        ProgramName::NoiseTransport,
        ProgramName::OrthogonalLic,
        ProgramName::Advection,
        ProgramName::Blend,
        ProgramName::Globe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProgramName::Globe => "globe",
            ProgramName::NoiseTransport => "noiseTransport",
            ProgramName::OrthogonalLic => "orthogonalLic",
            ProgramName::Advection => "advection",
            ProgramName::Blend => "blend",
        }
    }
}

impl fmt::Display for ProgramName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramName {
    type Err = ProgramError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProgramName::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| ProgramError::UnknownProgram(value.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

impl From<ShaderStage> for wgpu::naga::ShaderStage {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

/// GLSL type of a declared uniform or attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GlslType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "vec2")]
    Vec2,
    #[serde(rename = "vec3")]
    Vec3,
    #[serde(rename = "mat4")]
    Mat4,
    #[serde(rename = "sampler2D")]
    Sampler2D,
}

impl GlslType {
    pub fn as_str(self) -> &'static str {
        match self {
            GlslType::Int => "int",
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
        }
    }
}

/// Host-supplied value for a non-texture uniform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    /// Column-major, as GLSL expects.
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub fn glsl_type(&self) -> GlslType {
        match self {
            UniformValue::Int(_) => GlslType::Int,
            UniformValue::Float(_) => GlslType::Float,
            UniformValue::Vec2(_) => GlslType::Vec2,
            UniformValue::Mat4(_) => GlslType::Mat4,
        }
    }

    /// All-zero value of a type, used when neither a binding nor a default exists.
    pub fn zero(ty: GlslType) -> Option<Self> {
        match ty {
            GlslType::Int => Some(UniformValue::Int(0)),
            GlslType::Float => Some(UniformValue::Float(0.0)),
            GlslType::Vec2 => Some(UniformValue::Vec2([0.0; 2])),
            GlslType::Mat4 => Some(UniformValue::Mat4([[0.0; 4]; 4])),
            GlslType::Vec3 | GlslType::Sampler2D => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UniformDecl {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: GlslType,
    pub default: Option<UniformValue>,
}

impl UniformDecl {
    pub fn sampler(name: &'static str) -> Self {
        Self {
            name,
            ty: GlslType::Sampler2D,
            default: None,
        }
    }

    pub fn value(name: &'static str, default: UniformValue) -> Self {
        Self {
            name,
            ty: default.glsl_type(),
            default: Some(default),
        }
    }

    pub fn is_sampler(&self) -> bool {
        self.ty == GlslType::Sampler2D
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDecl {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: GlslType,
    pub location: u32,
}

/// One compiled unit: vertex and fragment source plus its uniform contract.
#[derive(Clone, Debug, Serialize)]
pub struct ProgramSource {
    pub name: ProgramName,
    pub attributes: Vec<AttributeDecl>,
    pub uniforms: Vec<UniformDecl>,
    pub vertex: String,
    pub fragment: String,
}

impl ProgramSource {
    /// Declared samplers in binding order.
    pub fn samplers(&self) -> impl Iterator<Item = &UniformDecl> {
        self.uniforms.iter().filter(|decl| decl.is_sampler())
    }

    /// Declared non-texture uniforms.
    pub fn values(&self) -> impl Iterator<Item = &UniformDecl> {
        self.uniforms.iter().filter(|decl| !decl.is_sampler())
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformDecl> {
        self.uniforms.iter().find(|decl| decl.name == name)
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// Immutable name -> source table, built once per settings.
#[derive(Clone, Debug)]
pub struct ProgramTable {
    sources: HashMap<ProgramName, ProgramSource>,
}

impl ProgramTable {
    pub fn new(settings: &PipelineSettings) -> Self {
        let passes = PipelinePasses::new(settings);
        let sources = ProgramName::ALL
            .into_iter()
            .map(|name| (name, sources::build(&passes.contract(name), settings)))
            .collect();
        Self { sources }
    }

    pub fn get(&self, name: ProgramName) -> &ProgramSource {
        // Every variant is inserted by `new`.
        &self.sources[&name]
    }

    pub fn lookup(&self, name: &str) -> Result<&ProgramSource, ProgramError> {
        let name: ProgramName = name.parse()?;
        Ok(self.get(name))
    }

    /// Sources in per-frame execution order.
    pub fn iter(&self) -> impl Iterator<Item = &ProgramSource> {
        ProgramName::ALL.into_iter().map(|name| self.get(name))
    }
}

/// Turns a program source into something the host can execute.
pub trait ProgramCompiler {
    type Program;

    fn compile(&self, source: &ProgramSource) -> Result<Self::Program, ProgramError>;
}

/// Program table plus a memo of compiled programs.
///
/// Owned by whatever owns the rendering context; programs compiled through it
/// live as long as the registry.
pub struct ProgramRegistry<P> {
    table: ProgramTable,
    compiled: Mutex<HashMap<ProgramName, Arc<P>>>,
}

impl<P> ProgramRegistry<P> {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self::from_table(ProgramTable::new(settings))
    }

    pub fn from_table(table: ProgramTable) -> Self {
        Self {
            table,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &ProgramTable {
        &self.table
    }

    /// Looks up a program by its symbolic name, compiling it on first use.
    pub fn load<C>(&self, name: &str, compiler: &C) -> Result<Arc<P>, ProgramError>
    where
        C: ProgramCompiler<Program = P>,
    {
        let name: ProgramName = name.parse()?;
        self.load_program(name, compiler)
    }

    pub fn load_program<C>(&self, name: ProgramName, compiler: &C) -> Result<Arc<P>, ProgramError>
    where
        C: ProgramCompiler<Program = P>,
    {
        let mut compiled = self
            .compiled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(program) = compiled.get(&name) {
            return Ok(program.clone());
        }

        let source = self.table.get(name);
        tracing::debug!(program = %name, "compiling program");
        let program = Arc::new(compiler.compile(source)?);
        compiled.insert(name, program.clone());
        Ok(program)
    }

    /// Compiles every program, stopping at the first failure.
    pub fn load_all<C>(&self, compiler: &C) -> Result<Vec<Arc<P>>, ProgramError>
    where
        C: ProgramCompiler<Program = P>,
    {
        ProgramName::ALL
            .into_iter()
            .map(|name| self.load_program(name, compiler))
            .collect()
    }

    pub fn is_compiled(&self, name: ProgramName) -> bool {
        self.compiled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&name)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct CountingCompiler {
        calls: Cell<u32>,
    }

    impl ProgramCompiler for CountingCompiler {
        type Program = ProgramName;

        fn compile(&self, source: &ProgramSource) -> Result<Self::Program, ProgramError> {
            self.calls.set(self.calls.get() + 1);
            Ok(source.name)
        }
    }

    struct FailingCompiler;

    impl ProgramCompiler for FailingCompiler {
        type Program = ();

        fn compile(&self, source: &ProgramSource) -> Result<Self::Program, ProgramError> {
            Err(ProgramError::Compile {
                program: source.name.to_string(),
                stage: ShaderStage::Fragment,
                message: "unsupported".into(),
            })
        }
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for name in ProgramName::ALL {
            assert_eq!(name.as_str().parse::<ProgramName>().unwrap(), name);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let registry: ProgramRegistry<ProgramName> =
            ProgramRegistry::new(&PipelineSettings::default());
        let compiler = CountingCompiler {
            calls: Cell::new(0),
        };
        for bad in ["", "Globe", "lic", "noise_transport", "blend "] {
            let err = registry.load(bad, &compiler).unwrap_err();
            assert!(matches!(err, ProgramError::UnknownProgram(ref n) if n == bad));
        }
        assert_eq!(compiler.calls.get(), 0);
    }

    #[test]
    fn compiles_lazily_and_memoizes() {
        let registry = ProgramRegistry::new(&PipelineSettings::default());
        let compiler = CountingCompiler {
            calls: Cell::new(0),
        };
        assert!(!registry.is_compiled(ProgramName::Blend));

        let first = registry.load("blend", &compiler).unwrap();
        let second = registry.load("blend", &compiler).unwrap();
        assert_eq!(*first, ProgramName::Blend);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.calls.get(), 1);
        assert!(registry.is_compiled(ProgramName::Blend));
        assert!(!registry.is_compiled(ProgramName::Globe));

        registry.load_all(&compiler).unwrap();
        assert_eq!(compiler.calls.get(), 5);
    }

    #[test]
    fn failed_compiles_are_not_memoized() {
        let registry: ProgramRegistry<()> = ProgramRegistry::new(&PipelineSettings::default());
        let err = registry.load("globe", &FailingCompiler).unwrap_err();
        assert!(err.is_build_failure());
        assert!(!registry.is_compiled(ProgramName::Globe));
    }

    #[test]
    fn globe_declares_mask_defaults() {
        let table = ProgramTable::new(&PipelineSettings::default());
        let globe = table.get(ProgramName::Globe);
        assert_eq!(globe.uniform("mask").unwrap().default, Some(UniformValue::Int(1)));
        assert_eq!(globe.uniform("m").unwrap().default, Some(UniformValue::Float(10.0)));
        assert_eq!(globe.uniform("n").unwrap().default, Some(UniformValue::Float(3.0)));
        let samplers: Vec<_> = globe.samplers().map(|decl| decl.name).collect();
        assert_eq!(samplers, ["texture", "oceanCurrent", "earthTexture"]);
    }

    #[test]
    fn lookup_by_string_matches_typed_lookup() {
        let table = ProgramTable::new(&PipelineSettings::default());
        assert_eq!(
            table.lookup("orthogonalLic").unwrap().name,
            ProgramName::OrthogonalLic
        );
        assert!(table.lookup("bogus").is_err());
        let order: Vec<_> = table.iter().map(|source| source.name).collect();
        assert_eq!(order, ProgramName::ALL);
    }
}
