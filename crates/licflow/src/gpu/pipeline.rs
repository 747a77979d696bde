use crate::compile::GpuProgram;
use crate::programs::{AttributeDecl, GlslType, ProgramSource};

use super::textures::{GpuTexture, DEPTH_FORMAT, TARGET_FORMAT};

/// Bind group layout shared by every program: the `FlowParams` block.
pub struct UniformLayout {
    pub layout: wgpu::BindGroupLayout,
}

impl UniformLayout {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("flow params layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        Self { layout }
    }
}

/// Render pipeline for one program plus the layout of its texture bind group.
pub struct PassPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub texture_layout: wgpu::BindGroupLayout,
    pub source: ProgramSource,
}

impl PassPipeline {
    pub fn new(
        device: &wgpu::Device,
        uniforms: &UniformLayout,
        program: &GpuProgram,
        topology: wgpu::PrimitiveTopology,
        depth: bool,
    ) -> Self {
        let source = &program.source;
        let label = source.name.as_str();
        let sampler_count = source.samplers().count();
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} texture layout")),
            entries: &build_texture_layout_entries(sampler_count),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} pipeline layout")),
            bind_group_layouts: &[&uniforms.layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let (stride, attributes) = vertex_attributes(&source.attributes);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            texture_layout,
            source: source.clone(),
        }
    }

    /// Binds `textures` to the program's samplers, in declaration order.
    pub fn bind_textures(&self, device: &wgpu::Device, textures: &[&GpuTexture]) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} textures", self.source.name)),
            layout: &self.texture_layout,
            entries: &build_texture_entries(textures),
        })
    }
}

fn vertex_attributes(decls: &[AttributeDecl]) -> (u64, Vec<wgpu::VertexAttribute>) {
    let mut offset = 0;
    let mut attributes = Vec::with_capacity(decls.len());
    let mut sorted: Vec<_> = decls.iter().collect();
    sorted.sort_by_key(|decl| decl.location);
    for decl in sorted {
        let (format, size) = match decl.ty {
            GlslType::Vec3 => (wgpu::VertexFormat::Float32x3, 12),
            _ => (wgpu::VertexFormat::Float32x2, 8),
        };
        attributes.push(wgpu::VertexAttribute {
            format,
            offset,
            shader_location: decl.location,
        });
        offset += size;
    }
    (offset, attributes)
}

pub fn build_texture_entries<'a>(textures: &[&'a GpuTexture]) -> Vec<wgpu::BindGroupEntry<'a>> {
    let mut entries = Vec::with_capacity(textures.len() * 2);
    for (index, texture) in textures.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2 + 1,
            resource: wgpu::BindingResource::Sampler(&texture.sampler),
        });
    }
    entries
}

pub fn build_texture_layout_entries(count: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(count * 2);
    for index in 0..count as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{ProgramName, ProgramTable};
    use crate::types::PipelineSettings;

    #[test]
    fn vertex_layouts_follow_declared_attributes() {
        let table = ProgramTable::new(&PipelineSettings::default());
        let (stride, attributes) = vertex_attributes(&table.get(ProgramName::Blend).attributes);
        assert_eq!(stride, 16);
        assert_eq!(attributes[1].offset, 8);
        assert_eq!(attributes[1].shader_location, 1);

        let (stride, attributes) = vertex_attributes(&table.get(ProgramName::Globe).attributes);
        assert_eq!(stride, 20);
        assert_eq!(attributes[0].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn texture_layout_pairs_views_with_samplers() {
        let entries = build_texture_layout_entries(3);
        let bindings: Vec<_> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, [0, 1, 2, 3, 4, 5]);
    }
}
