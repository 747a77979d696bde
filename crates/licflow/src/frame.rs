//! CPU rendition of the per-frame pass chain.
//!
//! Each pass shades every texel of its target from the previous pass's
//! output. Rows are shaded in parallel on the rayon pool; a pass returns only
//! once every row is written, which is the barrier between passes.

use std::collections::BTreeMap;

use anyhow::Result;
use glam::{Mat4, Vec2, Vec4};
use rayon::prelude::*;

use crate::bindings::UniformBindings;
use crate::field::VectorField;
use crate::globe::Camera;
use crate::inputs::FlowInputs;
use crate::passes::{GlobePass, PipelinePasses};
use crate::programs::{ProgramName, ProgramTable, UniformValue};
use crate::runtime::FrameRenderer;
use crate::texture::{texel_center, Texture};
use crate::types::{AddressMode, MaskParams, PipelineSettings, Resolution};

pub struct CpuFlowPipeline {
    settings: PipelineSettings,
    passes: PipelinePasses,
    programs: ProgramTable,
    field: VectorField,
    noise: Texture,
    earth: Texture,
    transported: Texture,
    lic: Texture,
    advected: Texture,
    blended: [Texture; 2],
    current: usize,
    frame: u64,
}

impl CpuFlowPipeline {
    pub fn new(settings: PipelineSettings, inputs: FlowInputs) -> Result<Self> {
        let inputs = inputs.with_filter(settings.filter);
        let field = VectorField::from_texture(inputs.field.texture().clone(), settings.resolution)?;
        let earth = inputs.earth_or_placeholder();
        let target = || {
            Texture::filled(settings.resolution, Vec4::ZERO)
                .with_filter(settings.filter)
                .with_address(AddressMode::ClampToEdge)
        };
        // The first advection step reads the noise itself.
        let seed = inputs
            .noise
            .resampled(settings.resolution)
            .with_address(AddressMode::ClampToEdge);

        tracing::info!(resolution = %settings.resolution, "initialised CPU flow pipeline");
        Ok(Self {
            passes: PipelinePasses::new(&settings),
            programs: ProgramTable::new(&settings),
            settings,
            field,
            noise: inputs.noise,
            earth,
            transported: target(),
            lic: target(),
            advected: target(),
            blended: [seed, target()],
            current: 0,
            frame: 0,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn transported(&self) -> &Texture {
        &self.transported
    }

    pub fn lic(&self) -> &Texture {
        &self.lic
    }

    pub fn advected(&self) -> &Texture {
        &self.advected
    }

    /// Most recent blended frame; the animation's visible state.
    pub fn blended(&self) -> &Texture {
        &self.blended[self.current]
    }

    /// Globe composite in texture space, one texel per field texel.
    pub fn globe_map(&self, bindings: &UniformBindings) -> Texture {
        let resolved = bindings.resolve(self.programs.get(ProgramName::Globe));
        let globe = GlobePass {
            mask: mask_from(&resolved, self.settings.mask),
        };
        let mut out = Texture::filled(self.settings.resolution, Vec4::ZERO);
        let (field, flow, earth) = (&self.field, self.blended(), &self.earth);
        shade_into(&mut out, |coord| globe.shade(field, flow, earth, coord));
        out
    }

    /// Globe as seen through the bound camera; transparent where the sphere is absent.
    pub fn render_globe(&self, bindings: &UniformBindings, size: Resolution) -> Texture {
        let resolved = bindings.resolve(self.programs.get(ProgramName::Globe));
        let globe = GlobePass {
            mask: mask_from(&resolved, self.settings.mask),
        };
        let camera = Camera {
            model_view: matrix(&resolved, "ModelViewMatrix"),
            projection: matrix(&resolved, "ProjectionMatrix"),
        };
        let mut out = Texture::filled(size, Vec4::ZERO);
        let (field, flow, earth) = (&self.field, self.blended(), &self.earth);
        shade_into(&mut out, |coord| {
            // Texture rows run top-down, NDC y runs bottom-up.
            let ndc = Vec2::new(coord.x * 2.0 - 1.0, 1.0 - coord.y * 2.0);
            camera
                .tex_coord_at(ndc)
                .map_or(Vec4::ZERO, |tex| globe.shade(field, flow, earth, tex))
        });
        out
    }
}

impl FrameRenderer for CpuFlowPipeline {
    fn render_frame(&mut self, bindings: &UniformBindings) -> Result<()> {
        let offset = match bindings
            .resolve(self.programs.get(ProgramName::NoiseTransport))
            .get("randomOffset")
        {
            Some(UniformValue::Vec2(offset)) => Vec2::from_array(*offset),
            _ => Vec2::ZERO,
        };

        let passes = self.passes;
        let field = &self.field;

        let noise = &self.noise;
        shade_into(&mut self.transported, |coord| {
            passes.noise_transport.shade(field, noise, coord, offset)
        });

        let transported = &self.transported;
        shade_into(&mut self.lic, |coord| {
            passes.orthogonal_lic.shade(field, transported, coord)
        });

        let previous = &self.blended[self.current];
        shade_into(&mut self.advected, |coord| {
            passes.advection.shade(field, previous, coord)
        });

        let next = 1 - self.current;
        let [first, second] = &mut self.blended;
        let target = if next == 0 { first } else { second };
        let (lic, advected) = (&self.lic, &self.advected);
        shade_into(target, |coord| passes.blend.shade(lic, advected, coord));

        self.current = next;
        self.frame += 1;
        tracing::debug!(frame = self.frame, "cpu frame complete");
        Ok(())
    }

    fn frame_index(&self) -> u64 {
        self.frame
    }
}

fn mask_from(resolved: &BTreeMap<&'static str, UniformValue>, fallback: MaskParams) -> MaskParams {
    let float = |name: &str, default: f32| match resolved.get(name) {
        Some(UniformValue::Float(value)) => *value,
        _ => default,
    };
    MaskParams {
        enabled: match resolved.get("mask") {
            Some(UniformValue::Int(value)) => *value != 0,
            _ => fallback.enabled,
        },
        m: float("m", fallback.m),
        n: float("n", fallback.n),
    }
}

fn matrix(resolved: &BTreeMap<&'static str, UniformValue>, name: &str) -> Mat4 {
    match resolved.get(name) {
        Some(UniformValue::Mat4(columns)) => Mat4::from_cols_array_2d(columns),
        _ => Mat4::IDENTITY,
    }
}

/// Evaluates `shade` at every texel centre of `target`, one row per task.
fn shade_into(target: &mut Texture, shade: impl Fn(Vec2) -> Vec4 + Sync) {
    let resolution = target.resolution();
    let width = resolution.width as usize;
    target
        .texels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = shade(texel_center(resolution, x as u32, y as u32));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels;
    use crate::texture::Sample;

    fn settings() -> PipelineSettings {
        PipelineSettings::with_resolution(16, 8)
    }

    fn noise() -> Texture {
        Texture::from_fn(Resolution::new(16, 8), |x, y| {
            let value = ((x * 7 + y * 13) % 16) as f32 / 16.0;
            Vec4::new(value, value, value, 1.0)
        })
        .with_address(AddressMode::Repeat)
    }

    #[test]
    fn shade_into_visits_every_texel_once() {
        let mut target = Texture::filled(Resolution::new(5, 7), Vec4::ZERO);
        shade_into(&mut target, |coord| coord.extend(0.0).extend(1.0));
        for y in 0..7 {
            for x in 0..5 {
                let expected = target.coord_of(x, y).extend(0.0).extend(1.0);
                assert_eq!(target.texel(x, y), expected);
            }
        }
    }

    #[test]
    fn frame_matches_kernels_texel_for_texel() {
        let field = VectorField::from_fn(settings().resolution, |x, y| {
            (x > 2).then(|| Vec2::new(0.1 * (y as f32 / 8.0), -0.05))
        });
        let inputs = FlowInputs::new(field.clone(), noise(), None);
        let mut pipeline = CpuFlowPipeline::new(settings(), inputs).unwrap();
        let previous = pipeline.blended().clone();

        let mut bindings = UniformBindings::new();
        bindings.set_random_offset(Vec2::new(0.3, 0.6));
        pipeline.render_frame(&bindings).unwrap();

        let s = settings();
        for (x, y) in [(0, 0), (5, 3), (15, 7), (9, 1)] {
            let coord = texel_center(s.resolution, x, y);
            let offset = Vec2::new(0.3, 0.6);
            let transported =
                kernels::noise_transport(&field, &noise(), coord, offset, s.noise_transport_step);
            assert_eq!(pipeline.transported().texel(x, y), transported);

            let lic = kernels::orthogonal_lic(&field, pipeline.transported(), coord, s.lic);
            assert_eq!(pipeline.lic().texel(x, y), lic);

            let advected = kernels::advection(&field, &previous, coord, s.advection);
            assert_eq!(pipeline.advected().texel(x, y), advected);

            let blended = kernels::blend(
                pipeline.lic().sample(coord),
                pipeline.advected().sample(coord),
                s.blend,
            );
            assert_eq!(pipeline.blended().texel(x, y), blended);
        }
        assert_eq!(pipeline.frame_index(), 1);
    }

    #[test]
    fn blended_buffers_alternate() {
        let field = VectorField::uniform(settings().resolution, Vec2::new(0.1, 0.0));
        let inputs = FlowInputs::new(field, noise(), None);
        let mut pipeline = CpuFlowPipeline::new(settings(), inputs).unwrap();
        let bindings = UniformBindings::new();
        assert_eq!(pipeline.current, 0);
        pipeline.render_frame(&bindings).unwrap();
        assert_eq!(pipeline.current, 1);
        pipeline.render_frame(&bindings).unwrap();
        assert_eq!(pipeline.current, 0);
    }

    #[test]
    fn globe_render_is_transparent_off_sphere() {
        let field = VectorField::from_fn(settings().resolution, |_, _| None);
        let earth = Texture::filled(Resolution::new(2, 2), Vec4::new(0.2, 0.4, 0.6, 1.0));
        let mut pipeline =
            CpuFlowPipeline::new(settings(), FlowInputs::new(field, noise(), Some(earth))).unwrap();
        let bindings = UniformBindings::new();
        pipeline.render_frame(&bindings).unwrap();

        let image = pipeline.render_globe(&bindings, Resolution::new(32, 32));
        assert_eq!(image.texel(0, 0), Vec4::ZERO);
        let centre = image.texel(16, 16);
        assert!((centre - Vec4::new(0.2, 0.4, 0.6, 1.0)).abs().max_element() < 1e-6);
    }
}
