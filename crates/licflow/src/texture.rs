//! CPU-side RGBA textures with GL-style sampling.
//!
//! Coordinates are normalised `[0, 1]` with the origin at the top-left texel,
//! matching how `wgpu` addresses the render targets, so a CPU frame and a GPU
//! frame can be compared texel for texel.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};
use rand::Rng;

use crate::types::{AddressMode, Filter, Resolution};

/// Anything that can be sampled at a normalised coordinate.
pub trait Sample {
    fn sample(&self, coord: Vec2) -> Vec4;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
    filter: Filter,
    address: AddressMode,
}

impl Texture {
    /// Creates a texture filled with a single colour.
    pub fn filled(resolution: Resolution, value: Vec4) -> Self {
        Self {
            width: resolution.width.max(1),
            height: resolution.height.max(1),
            texels: vec![value; resolution.width.max(1) as usize * resolution.height.max(1) as usize],
            filter: Filter::default(),
            address: AddressMode::default(),
        }
    }

    /// Builds a texture by evaluating `f(x, y)` for every texel.
    pub fn from_fn(resolution: Resolution, mut f: impl FnMut(u32, u32) -> Vec4) -> Self {
        let mut texture = Self::filled(resolution, Vec4::ZERO);
        for y in 0..texture.height {
            for x in 0..texture.width {
                let index = texture.index(x, y);
                texture.texels[index] = f(x, y);
            }
        }
        texture
    }

    /// Converts an 8-bit image into normalised texels.
    pub fn from_rgba8(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_fn(Resolution::new(width, height), |x, y| {
            let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
            Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
        })
    }

    /// Decodes an image file (PNG, JPEG, BMP, GIF).
    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to open texture at {}", path.display()))?;
        Ok(Self::from_rgba8(&image.to_rgba8()))
    }

    /// Tileable white noise; each texel is an opaque grey level.
    pub fn white_noise(resolution: Resolution, rng: &mut impl Rng) -> Self {
        Self::from_fn(resolution, |_, _| {
            let value: f32 = rng.gen();
            Vec4::new(value, value, value, 1.0)
        })
        .with_address(AddressMode::Repeat)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_address(mut self, address: AddressMode) -> Self {
        self.address = address;
        self
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn address(&self) -> AddressMode {
        self.address
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub(crate) fn texels_mut(&mut self) -> &mut [Vec4] {
        &mut self.texels
    }

    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[self.index(x, y)]
    }

    /// Normalised coordinate of the centre of texel `(x, y)`.
    pub fn coord_of(&self, x: u32, y: u32) -> Vec2 {
        texel_center(self.resolution(), x, y)
    }

    /// Quantises to 8 bits per channel.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let texel = self.texel(x, y).clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
            Rgba([
                texel.x.round() as u8,
                texel.y.round() as u8,
                texel.z.round() as u8,
                texel.w.round() as u8,
            ])
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_rgba8()
            .save(path)
            .with_context(|| format!("failed to write texture to {}", path.display()))
    }

    /// Resamples this texture onto a grid of a different size.
    pub fn resampled(&self, resolution: Resolution) -> Self {
        Self::from_fn(resolution, |x, y| self.sample(texel_center(resolution, x, y)))
            .with_filter(self.filter)
            .with_address(self.address)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn fetch(&self, x: i64, y: i64) -> Vec4 {
        let x = wrap(x, self.width, self.address);
        let y = wrap(y, self.height, self.address);
        self.texel(x, y)
    }
}

impl Sample for Texture {
    fn sample(&self, coord: Vec2) -> Vec4 {
        let size = self.resolution().size();
        match self.filter {
            Filter::Nearest => {
                let texel = (coord * size).floor();
                self.fetch(texel.x as i64, texel.y as i64)
            }
            Filter::Linear => {
                let position = coord * size - Vec2::splat(0.5);
                let base = position.floor();
                let frac = position - base;
                let (x0, y0) = (base.x as i64, base.y as i64);
                let top = self.fetch(x0, y0).lerp(self.fetch(x0 + 1, y0), frac.x);
                let bottom = self.fetch(x0, y0 + 1).lerp(self.fetch(x0 + 1, y0 + 1), frac.x);
                top.lerp(bottom, frac.y)
            }
        }
    }
}

/// Normalised coordinate of the centre of texel `(x, y)` on a grid.
pub fn texel_center(resolution: Resolution, x: u32, y: u32) -> Vec2 {
    (Vec2::new(x as f32, y as f32) + Vec2::splat(0.5)) / resolution.size()
}

fn wrap(index: i64, extent: u32, address: AddressMode) -> u32 {
    let extent = i64::from(extent.max(1));
    match address {
        AddressMode::ClampToEdge => index.clamp(0, extent - 1) as u32,
        AddressMode::Repeat => index.rem_euclid(extent) as u32,
    }
}
