use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::bindings::UniformBindings;
use crate::compile::{DeviceCompiler, GpuProgram};
use crate::globe::SphereMesh;
use crate::inputs::FlowInputs;
use crate::programs::{ProgramName, ProgramRegistry};
use crate::runtime::FrameRenderer;
use crate::types::{AddressMode, PipelineSettings, Resolution};

use super::context::GpuContext;
use super::pipeline::{PassPipeline, UniformLayout};
use super::textures::{create_depth, GpuTexture};
use super::uniforms::FlowUniforms;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    vertex_coord: [f32; 2],
    tex_coord: [f32; 2],
}

/// Triangle strip covering clip space; `texCoord` origin is the top-left texel.
const QUAD: [QuadVertex; 4] = [
    QuadVertex {
        vertex_coord: [-1.0, -1.0],
        tex_coord: [0.0, 1.0],
    },
    QuadVertex {
        vertex_coord: [1.0, -1.0],
        tex_coord: [1.0, 1.0],
    },
    QuadVertex {
        vertex_coord: [-1.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    QuadVertex {
        vertex_coord: [1.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
];

struct Pipelines {
    noise_transport: PassPipeline,
    orthogonal_lic: PassPipeline,
    advection: PassPipeline,
    blend: PassPipeline,
    globe: PassPipeline,
}

/// Runs the pass chain on a `wgpu` device.
pub struct GpuFlowRenderer {
    context: GpuContext,
    settings: PipelineSettings,
    registry: ProgramRegistry<GpuProgram>,
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    quad: wgpu::Buffer,
    sphere_vertices: wgpu::Buffer,
    sphere_indices: wgpu::Buffer,
    sphere_index_count: u32,
    field: GpuTexture,
    noise: GpuTexture,
    earth: GpuTexture,
    transported: GpuTexture,
    lic: GpuTexture,
    advected: GpuTexture,
    blended: [GpuTexture; 2],
    current: usize,
    frame: u64,
}

impl GpuFlowRenderer {
    pub fn new(context: GpuContext, settings: PipelineSettings, inputs: FlowInputs) -> Result<Self> {
        context.check_resolution(settings.resolution)?;
        let inputs = inputs.with_filter(settings.filter);
        let device = &context.device;
        let queue = &context.queue;

        let registry = ProgramRegistry::new(&settings);
        let compiler = DeviceCompiler::new(device);
        let uniform_layout = UniformLayout::new(device);
        let build = |name: ProgramName, topology, depth| -> Result<PassPipeline> {
            let program = registry
                .load_program(name, &compiler)
                .with_context(|| format!("failed to build program '{name}'"))?;
            Ok(PassPipeline::new(device, &uniform_layout, &program, topology, depth))
        };
        let strip = wgpu::PrimitiveTopology::TriangleStrip;
        let pipelines = Pipelines {
            noise_transport: build(ProgramName::NoiseTransport, strip, false)?,
            orthogonal_lic: build(ProgramName::OrthogonalLic, strip, false)?,
            advection: build(ProgramName::Advection, strip, false)?,
            blend: build(ProgramName::Blend, strip, false)?,
            globe: build(ProgramName::Globe, wgpu::PrimitiveTopology::TriangleList, true)?,
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flow params"),
            contents: bytemuck::bytes_of(&FlowUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flow params bind group"),
            layout: &uniform_layout.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let mesh = SphereMesh::default();
        let sphere_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sphere vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sphere indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let field = GpuTexture::upload(device, queue, inputs.field.texture(), "ocean current");
        let noise = GpuTexture::upload(device, queue, &inputs.noise, "noise");
        let earth = match &inputs.earth {
            Some(earth) => GpuTexture::upload(device, queue, earth, "earth"),
            None => {
                tracing::warn!("no earth texture bound; using placeholder");
                GpuTexture::placeholder(device, queue, "earth placeholder")
            }
        };

        let resolution = settings.resolution;
        let target =
            |label: &str| GpuTexture::render_target(device, resolution, settings.filter, label);
        let transported = target("transported noise");
        let lic = target("orthogonal lic");
        let advected = target("advected");
        let blended = [target("blended a"), target("blended b")];
        // The first advection step reads the noise itself.
        blended[0].write(
            queue,
            &inputs.noise.clone().with_address(AddressMode::ClampToEdge),
        );

        tracing::info!(
            adapter = %context.adapter_info.name,
            resolution = %resolution,
            "initialised GPU flow pipeline"
        );

        Ok(Self {
            context,
            transported,
            lic,
            advected,
            blended,
            settings,
            registry,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            quad,
            sphere_vertices,
            sphere_indices,
            sphere_index_count: mesh.indices.len() as u32,
            field,
            noise,
            earth,
            current: 0,
            frame: 0,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ProgramRegistry<GpuProgram> {
        &self.registry
    }

    /// Most recent blended frame, copied back to the host.
    pub fn read_blended(&self) -> Result<RgbaImage> {
        self.blended[self.current].read_back(&self.context.device, &self.context.queue)
    }

    /// Draws the globe into a fresh target of `size` and reads it back.
    pub fn render_globe(&self, bindings: &UniformBindings, size: Resolution) -> Result<RgbaImage> {
        self.context.check_resolution(size)?;
        let device = &self.context.device;
        self.write_uniforms(bindings);

        let target = GpuTexture::render_target(device, size, self.settings.filter, "globe");
        let depth = create_depth(device, size);
        let textures = self.pipelines.globe.bind_textures(
            device,
            &[&self.blended[self.current], &self.field, &self.earth],
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("globe encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("globe pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.globe.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &textures, &[]);
            pass.set_vertex_buffer(0, self.sphere_vertices.slice(..));
            pass.set_index_buffer(self.sphere_indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.sphere_index_count, 0, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));

        target.read_back(device, &self.context.queue)
    }

    fn write_uniforms(&self, bindings: &UniformBindings) {
        let resolved = bindings.resolve_all(self.registry.table().iter());
        FlowUniforms::from_resolved(&resolved).write(&self.context.queue, &self.uniform_buffer);
    }

    fn encode_quad(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &PassPipeline,
        inputs: &[&GpuTexture],
        target: &GpuTexture,
    ) {
        let textures = pipeline.bind_textures(&self.context.device, inputs);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pipeline.source.name.as_str()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &textures, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD.len() as u32, 0..1);
    }
}

impl FrameRenderer for GpuFlowRenderer {
    fn render_frame(&mut self, bindings: &UniformBindings) -> Result<()> {
        self.write_uniforms(bindings);
        let next = 1 - self.current;

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        let p = &self.pipelines;
        self.encode_quad(
            &mut encoder,
            &p.noise_transport,
            &[&self.field, &self.noise],
            &self.transported,
        );
        self.encode_quad(
            &mut encoder,
            &p.orthogonal_lic,
            &[&self.field, &self.transported],
            &self.lic,
        );
        self.encode_quad(
            &mut encoder,
            &p.advection,
            &[&self.field, &self.blended[self.current]],
            &self.advected,
        );
        self.encode_quad(
            &mut encoder,
            &p.blend,
            &[&self.lic, &self.advected, &self.field],
            &self.blended[next],
        );
        self.context.queue.submit(Some(encoder.finish()));

        // Swap only once the frame is submitted so advection never reads what blend writes.
        self.current = next;
        self.frame += 1;
        tracing::debug!(frame = self.frame, "gpu frame submitted");
        Ok(())
    }

    fn frame_index(&self) -> u64 {
        self.frame
    }
}
