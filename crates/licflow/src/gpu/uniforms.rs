use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};

use crate::programs::UniformValue;

/// CPU mirror of the `FlowParams` std140 block every program declares.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub random_offset: [f32; 2],
    pub mask: i32,
    pub m: f32,
    pub n: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for FlowUniforms {}
unsafe impl Pod for FlowUniforms {}

impl FlowUniforms {
    /// Packs resolved uniforms; names a program does not declare stay zero.
    pub fn from_resolved(resolved: &BTreeMap<&'static str, UniformValue>) -> Self {
        let mut uniforms = Self::zeroed();
        for (&name, value) in resolved {
            match (name, *value) {
                ("ModelViewMatrix", UniformValue::Mat4(columns)) => uniforms.model_view = columns,
                ("ProjectionMatrix", UniformValue::Mat4(columns)) => uniforms.projection = columns,
                ("randomOffset", UniformValue::Vec2(offset)) => uniforms.random_offset = offset,
                ("mask", UniformValue::Int(mask)) => uniforms.mask = mask,
                ("m", UniformValue::Float(m)) => uniforms.m = m,
                ("n", UniformValue::Float(n)) => uniforms.n = n,
                _ => tracing::warn!(uniform = name, "uniform has no slot in FlowParams"),
            }
        }
        uniforms
    }

    pub fn write(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(self));
    }
}
