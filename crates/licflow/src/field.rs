//! Packed ocean-current field.
//!
//! The field arrives as an RGB texture: red and green carry the vector
//! components biased by `+0.5`, blue is non-zero over water and exactly zero
//! over land.

use anyhow::{bail, Result};
use glam::{Vec2, Vec4};

use crate::texture::{Sample, Texture};
use crate::types::{Filter, Resolution};

/// Land/water classification shared by every pass that reads the field.
pub fn is_water(sample: Vec4) -> bool {
    sample.z != 0.0
}

/// Unpacks the flow vector stored in a field texel.
pub fn decode(sample: Vec4) -> Vec2 {
    Vec2::new(sample.x - 0.5, sample.y - 0.5)
}

/// The flow vector rotated by 90°, used to trace LIC streamlines across the flow.
pub fn decode_orthogonal(sample: Vec4) -> Vec2 {
    Vec2::new(-(sample.y - 0.5), sample.x - 0.5)
}

/// Packs a flow vector (`None` for land) into a field texel.
pub fn encode(vector: Option<Vec2>) -> Vec4 {
    match vector {
        Some(v) => Vec4::new(v.x + 0.5, v.y + 0.5, 1.0, 1.0),
        None => Vec4::new(0.5, 0.5, 0.0, 1.0),
    }
}

/// Read-only vector field bound for the lifetime of an animation.
#[derive(Debug, Clone)]
pub struct VectorField {
    texture: Texture,
}

impl VectorField {
    /// Wraps an already-packed texture, checking it matches the pipeline grid.
    pub fn from_texture(texture: Texture, expected: Resolution) -> Result<Self> {
        if texture.resolution() != expected {
            bail!(
                "field texture is {}, pipeline expects {}",
                texture.resolution(),
                expected
            );
        }
        Ok(Self { texture })
    }

    /// Builds a field by packing `f(x, y)` for every texel (`None` marks land).
    pub fn from_fn(resolution: Resolution, mut f: impl FnMut(u32, u32) -> Option<Vec2>) -> Self {
        Self {
            texture: Texture::from_fn(resolution, |x, y| encode(f(x, y))),
        }
    }

    /// Same vector over every texel, all water.
    pub fn uniform(resolution: Resolution, vector: Vec2) -> Self {
        Self::from_fn(resolution, |_, _| Some(vector))
    }

    pub fn with_filter(self, filter: Filter) -> Self {
        Self {
            texture: self.texture.with_filter(filter),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.texture.resolution()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn is_water_at(&self, coord: Vec2) -> bool {
        is_water(self.texture.sample(coord))
    }

    pub fn field_at(&self, coord: Vec2) -> Vec2 {
        decode(self.texture.sample(coord))
    }

    pub fn orthogonal_field_at(&self, coord: Vec2) -> Vec2 {
        decode_orthogonal(self.texture.sample(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_flag_is_exactly_the_blue_channel() {
        for z in [0.0, -0.0, 1e-7, 0.5, 1.0, -1.0] {
            let sample = Vec4::new(0.3, 0.7, z, 1.0);
            assert_eq!(is_water(sample), z != 0.0, "z = {z}");
        }
    }

    #[test]
    fn orthogonal_field_is_perpendicular() {
        let steps = [0.0, 0.1, 0.25, 0.5, 0.62, 0.75, 1.0];
        for &x in &steps {
            for &y in &steps {
                let sample = Vec4::new(x, y, 1.0, 1.0);
                assert_eq!(decode(sample).dot(decode_orthogonal(sample)), 0.0);
            }
        }
    }

    #[test]
    fn encode_round_trips_through_decode() {
        let vector = Vec2::new(0.25, -0.125);
        assert_eq!(decode(encode(Some(vector))), vector);
        assert!(is_water(encode(Some(Vec2::ZERO))));
        assert!(!is_water(encode(None)));
    }

    #[test]
    fn rejects_mismatched_resolution() {
        let texture = Texture::filled(Resolution::new(8, 4), encode(None));
        assert!(VectorField::from_texture(texture.clone(), Resolution::new(8, 4)).is_ok());
        assert!(VectorField::from_texture(texture, Resolution::new(1024, 512)).is_err());
    }
}
