//! Host-side uniform values for a frame.

use std::collections::BTreeMap;

use glam::{Mat4, Vec2};
use tracing::warn;

use crate::programs::{ProgramSource, UniformValue};
use crate::types::MaskParams;

/// Name -> value map the host fills in before drawing.
///
/// Values are resolved against a program's declared uniforms; anything the
/// program declares but the host never set falls back to the declared default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBindings {
    values: BTreeMap<String, UniformValue>,
}

impl UniformBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: UniformValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn set_random_offset(&mut self, offset: Vec2) -> &mut Self {
        self.set("randomOffset", UniformValue::Vec2(offset.to_array()))
    }

    pub fn set_camera(&mut self, model_view: Mat4, projection: Mat4) -> &mut Self {
        self.set("ModelViewMatrix", UniformValue::Mat4(model_view.to_cols_array_2d()));
        self.set("ProjectionMatrix", UniformValue::Mat4(projection.to_cols_array_2d()))
    }

    /// Binds the globe mask switch and its two exponents.
    pub fn set_mask(&mut self, mask: MaskParams) -> &mut Self {
        self.set("mask", UniformValue::Int(i32::from(mask.enabled)));
        self.set("m", UniformValue::Float(mask.m));
        self.set("n", UniformValue::Float(mask.n))
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    /// Value for every non-texture uniform `program` declares.
    ///
    /// Missing or mistyped bindings log a warning and use the declared default
    /// (or zero when the declaration has none).
    pub fn resolve(&self, program: &ProgramSource) -> BTreeMap<&'static str, UniformValue> {
        let mut resolved = BTreeMap::new();
        for decl in program.values() {
            let bound = match self.values.get(decl.name) {
                Some(value) if value.glsl_type() == decl.ty => Some(*value),
                Some(value) => {
                    warn!(
                        program = %program.name,
                        uniform = decl.name,
                        expected = decl.ty.as_str(),
                        found = value.glsl_type().as_str(),
                        "uniform binding has the wrong type; using declared default"
                    );
                    None
                }
                None => {
                    warn!(
                        program = %program.name,
                        uniform = decl.name,
                        "missing uniform binding; using declared default"
                    );
                    None
                }
            };
            if let Some(value) = bound
                .or(decl.default)
                .or_else(|| UniformValue::zero(decl.ty))
            {
                resolved.insert(decl.name, value);
            }
        }
        resolved
    }

    /// Resolved uniforms of several programs merged into one map.
    ///
    /// All programs share one parameter block, so the same name must mean the
    /// same thing everywhere.
    pub fn resolve_all<'a>(
        &self,
        programs: impl IntoIterator<Item = &'a ProgramSource>,
    ) -> BTreeMap<&'static str, UniformValue> {
        let mut merged = BTreeMap::new();
        for program in programs {
            merged.extend(self.resolve(program));
        }
        merged
    }
}
