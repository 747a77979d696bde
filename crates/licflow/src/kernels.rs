//! Per-texel reference kernels.
//!
//! Each function computes what one fragment invocation of the matching GLSL
//! program writes, given the same inputs. They are pure so the CPU pipeline and
//! the tests can run them anywhere.

use glam::{Vec2, Vec4};

use crate::field::VectorField;
use crate::texture::Sample;
use crate::types::{BlendWeights, Integration, MaskParams, MAGNITUDE_CEILING};

/// Moves noise one step along the field, jittered by `offset`.
pub fn noise_transport(
    field: &VectorField,
    noise: &impl Sample,
    coord: Vec2,
    offset: Vec2,
    step: f32,
) -> Vec4 {
    if !field.is_water_at(coord) {
        return noise.sample(coord);
    }
    let size = field.resolution().size();
    let advected = coord + offset + field.field_at(coord) * step / size;
    noise.sample(advected)
}

/// Positions visited by one direction of a streamline trace.
///
/// Each entry is the position sampled *before* the corresponding step, so the
/// start position comes first and the position after the last step is never
/// returned.
pub fn streamline(
    start: Vec2,
    integration: Integration,
    size: Vec2,
    direction: f32,
    mut vector_at: impl FnMut(Vec2) -> Vec2,
) -> Vec<Vec2> {
    let mut positions = Vec::with_capacity(integration.steps as usize);
    let mut pos = start;
    let mut vector = vector_at(pos);
    for _ in 0..integration.steps {
        positions.push(pos);
        pos += direction * vector * integration.step / size;
        vector = vector_at(pos);
    }
    positions
}

/// Line integral convolution of the transported noise across the flow.
///
/// Averages `2 * steps` samples: one backward and one forward trace that both
/// start at `coord`, so the centre texel carries twice the weight of any
/// other position.
pub fn orthogonal_lic(
    field: &VectorField,
    transported: &impl Sample,
    coord: Vec2,
    integration: Integration,
) -> Vec4 {
    if !field.is_water_at(coord) {
        return transported.sample(coord);
    }
    let size = field.resolution().size();
    let orthogonal = |pos: Vec2| field.orthogonal_field_at(pos);

    let backward = streamline(coord, integration, size, -1.0, orthogonal);
    let forward = streamline(coord, integration, size, 1.0, orthogonal);

    let samples = backward.len() + forward.len();
    if samples == 0 {
        return transported.sample(coord).truncate().extend(1.0);
    }
    let sum = backward
        .iter()
        .chain(forward.iter())
        .fold(Vec4::ZERO, |acc, &pos| acc + transported.sample(pos));
    (sum.truncate() / samples as f32).extend(1.0)
}

/// Where the value now at `coord` was one integration path ago.
pub fn advection_source(field: &VectorField, coord: Vec2, integration: Integration) -> Vec2 {
    let size = field.resolution().size();
    let mut pos = coord;
    let mut vector = field.field_at(pos);
    for _ in 0..integration.steps {
        pos -= vector * integration.step / size;
        vector = field.field_at(pos);
    }
    pos
}

/// Backward-in-time advection of the previous blended frame.
pub fn advection(
    field: &VectorField,
    previous: &impl Sample,
    coord: Vec2,
    integration: Integration,
) -> Vec4 {
    if !field.is_water_at(coord) {
        return previous.sample(coord);
    }
    previous.sample(advection_source(field, coord, integration))
}

/// Mixes fresh LIC detail into the advected history.
pub fn blend(lic: Vec4, advected: Vec4, weights: BlendWeights) -> Vec4 {
    lic * weights.lic + advected * weights.advected
}

/// Per-channel alpha of the globe overlay.
pub fn mask_alpha(magnitude: f32, pixel: Vec4, mask: MaskParams) -> Vec4 {
    if !mask.enabled {
        return Vec4::ONE;
    }
    let ratio = (magnitude / MAGNITUDE_CEILING).min(1.0);
    let slow = 1.0 - (1.0 - ratio).powf(mask.m);
    let faint = Vec4::ONE - (Vec4::ONE - pixel).powf(mask.n);
    faint * slow
}

/// Globe fragment: masked flow over water, base imagery over land.
pub fn globe(
    field: &VectorField,
    flow: &impl Sample,
    earth: &impl Sample,
    coord: Vec2,
    mask: MaskParams,
) -> Vec4 {
    if !field.is_water_at(coord) {
        return earth.sample(coord);
    }
    let pixel = flow.sample(coord);
    let magnitude = field.field_at(coord).length();
    pixel * mask_alpha(magnitude, pixel, mask)
}
