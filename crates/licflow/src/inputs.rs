//! Static textures an animation is started with.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::field::VectorField;
use crate::texture::Texture;
use crate::types::{AddressMode, Filter, PipelineSettings, Resolution};

/// Ocean-current field, noise and optional earth imagery.
#[derive(Debug, Clone)]
pub struct FlowInputs {
    pub field: VectorField,
    pub noise: Texture,
    pub earth: Option<Texture>,
}

impl FlowInputs {
    pub fn new(field: VectorField, noise: Texture, earth: Option<Texture>) -> Self {
        Self { field, noise, earth }
    }

    /// Decodes the input images, generating white noise when `noise` is `None`.
    pub fn load(
        settings: &PipelineSettings,
        field: &Path,
        noise: Option<&Path>,
        earth: Option<&Path>,
        noise_seed: u64,
    ) -> Result<Self> {
        let texture = Texture::load(field)?;
        let field = VectorField::from_texture(texture, settings.resolution)
            .with_context(|| format!("ocean-current field at {}", field.display()))?;
        info!(resolution = %field.resolution(), "loaded ocean-current field");

        let noise = match noise {
            Some(path) => Texture::load(path)?.with_address(AddressMode::Repeat),
            None => {
                info!(seed = noise_seed, "generating white noise");
                let mut rng = StdRng::seed_from_u64(noise_seed);
                Texture::white_noise(settings.resolution, &mut rng)
            }
        };

        let earth = earth.map(Texture::load).transpose()?;
        Ok(Self::new(field, noise, earth))
    }

    /// Earth imagery, or a 1×1 opaque black placeholder when none was given.
    pub fn earth_or_placeholder(&self) -> Texture {
        match &self.earth {
            Some(earth) => earth.clone(),
            None => {
                warn!("no earth texture bound; using placeholder");
                placeholder()
            }
        }
    }

    /// Applies the pipeline's filter to every input.
    pub fn with_filter(self, filter: Filter) -> Self {
        Self {
            field: self.field.with_filter(filter),
            noise: self.noise.with_filter(filter),
            earth: self.earth.map(|earth| earth.with_filter(filter)),
        }
    }
}

pub fn placeholder() -> Texture {
    Texture::filled(Resolution::new(1, 1), Vec4::new(0.0, 0.0, 0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::encode;
    use tempfile::TempDir;

    #[test]
    fn loads_field_and_generates_noise() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("field.png");
        let settings = PipelineSettings::with_resolution(8, 4);
        Texture::filled(settings.resolution, encode(None))
            .save(&path)
            .unwrap();

        let inputs = FlowInputs::load(&settings, &path, None, None, 9).unwrap();
        assert_eq!(inputs.field.resolution(), settings.resolution);
        assert_eq!(inputs.noise.resolution(), settings.resolution);
        assert_eq!(inputs.noise.address(), AddressMode::Repeat);
        assert!(inputs.earth.is_none());
        assert_eq!(inputs.earth_or_placeholder().resolution(), Resolution::new(1, 1));
    }

    #[test]
    fn rejects_field_with_wrong_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("field.png");
        Texture::filled(Resolution::new(4, 4), encode(None))
            .save(&path)
            .unwrap();
        let settings = PipelineSettings::with_resolution(8, 4);
        assert!(FlowInputs::load(&settings, &path, None, None, 0).is_err());
    }

    #[test]
    fn missing_files_are_reported() {
        let settings = PipelineSettings::with_resolution(8, 4);
        let err = FlowInputs::load(&settings, Path::new("/nonexistent/field.png"), None, None, 0)
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/field.png"));
    }
}
