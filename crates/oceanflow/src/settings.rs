use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use flowconfig::{FilterSetting, FlowConfig};
use licflow::{BlendWeights, Filter, Integration, MaskParams, PipelineSettings, Resolution};

/// Frames rendered when neither the CLI nor the config names a count.
pub const DEFAULT_FRAMES: u32 = 60;

pub fn load_config(path: Option<&Path>) -> Result<FlowConfig> {
    let Some(path) = path else {
        tracing::debug!("no configuration file given; using built-in defaults");
        return Ok(FlowConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    let config = FlowConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid configuration at {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded flow configuration");
    Ok(config)
}

pub fn pipeline_settings(config: &FlowConfig) -> PipelineSettings {
    PipelineSettings {
        resolution: Resolution::new(config.resolution.width, config.resolution.height),
        noise_transport_step: config.noise_transport.step,
        lic: Integration {
            steps: config.lic.steps,
            step: config.lic.step,
        },
        advection: Integration {
            steps: config.advection.steps,
            step: config.advection.step,
        },
        blend: BlendWeights {
            lic: config.blend.lic,
            advected: config.blend.advected,
        },
        mask: MaskParams {
            enabled: config.globe.mask,
            m: config.globe.m,
            n: config.globe.n,
        },
        filter: match config.sampling.filter {
            FilterSetting::Linear => Filter::Linear,
            FilterSetting::Nearest => Filter::Nearest,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_default_settings() {
        assert_eq!(
            pipeline_settings(&FlowConfig::default()),
            PipelineSettings::default()
        );
    }

    #[test]
    fn overrides_reach_every_pass() {
        let config = FlowConfig::from_toml_str(
            r#"
[resolution]
width = 64
height = 32

[lic]
steps = 5

[globe]
mask = false
n = 2.0

[sampling]
filter = "nearest"
"#,
        )
        .unwrap();
        let settings = pipeline_settings(&config);
        assert_eq!(settings.resolution, Resolution::new(64, 32));
        assert_eq!(settings.lic.steps, 5);
        assert_eq!(settings.lic.step, 0.75);
        assert!(!settings.mask.enabled);
        assert_eq!(settings.mask.n, 2.0);
        assert_eq!(settings.filter, Filter::Nearest);
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }
}
