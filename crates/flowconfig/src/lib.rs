use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level flow configuration as read from `flow.toml`.
///
/// Every table is optional; missing keys fall back to the constants the
/// pipeline was tuned with (1024x512 field, 25/25/35 integration steps).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub noise_transport: NoiseTransport,
    #[serde(default)]
    pub lic: Lic,
    #[serde(default)]
    pub advection: Advection,
    #[serde(default)]
    pub blend: Blend,
    #[serde(default)]
    pub globe: Globe,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub animation: Animation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NoiseTransport {
    pub step: f32,
}

impl Default for NoiseTransport {
    fn default() -> Self {
        Self { step: 10.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Lic {
    pub steps: u32,
    pub step: f32,
}

impl Default for Lic {
    fn default() -> Self {
        Self {
            steps: 25,
            step: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Advection {
    pub steps: u32,
    pub step: f32,
}

impl Default for Advection {
    fn default() -> Self {
        Self {
            steps: 35,
            step: 0.125,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Blend {
    pub lic: f32,
    pub advected: f32,
}

impl Default for Blend {
    fn default() -> Self {
        Self {
            lic: 0.05,
            advected: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Globe {
    pub mask: bool,
    pub m: f32,
    pub n: f32,
}

impl Default for Globe {
    fn default() -> Self {
        Self {
            mask: true,
            m: 10.0,
            n: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    Linear,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Sampling {
    #[serde(default = "default_filter", deserialize_with = "deserialize_filter")]
    pub filter: FilterSetting,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Animation {
    pub frames: Option<u32>,
    pub seed: Option<u64>,
}

fn default_version() -> u32 {
    1
}

fn default_filter() -> FilterSetting {
    FilterSetting::Linear
}

fn deserialize_filter<'de, D>(deserializer: D) -> Result<FilterSetting, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = FilterSetting;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a sampler filter name (`linear` or `nearest`)")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_filter(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_str(Visitor)
}

fn parse_filter(raw: &str) -> Result<FilterSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "linear" | "bilinear" | "smooth" => Ok(FilterSetting::Linear),
        "nearest" | "point" => Ok(FilterSetting::Nearest),
        other => Err(format!("invalid sampler filter '{other}'")),
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            resolution: Resolution::default(),
            noise_transport: NoiseTransport::default(),
            lic: Lic::default(),
            advection: Advection::default(),
            blend: Blend::default(),
            globe: Globe::default(),
            sampling: Sampling::default(),
            animation: Animation::default(),
        }
    }
}

impl FlowConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FlowConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.width, self.resolution.height
            )));
        }

        validate_step("noise_transport.step", self.noise_transport.step)?;
        validate_step("lic.step", self.lic.step)?;
        validate_step("advection.step", self.advection.step)?;

        if self.lic.steps == 0 {
            return Err(ConfigError::Invalid("lic.steps must be > 0".into()));
        }
        if self.advection.steps == 0 {
            return Err(ConfigError::Invalid("advection.steps must be > 0".into()));
        }

        for (name, weight) in [
            ("blend.lic", self.blend.lic),
            ("blend.advected", self.blend.advected),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        let total = self.blend.lic + self.blend.advected;
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "blend weights must sum to 1.0, got {total}"
            )));
        }

        if !self.globe.m.is_finite() || self.globe.m < 0.0 {
            return Err(ConfigError::Invalid("globe.m must be >= 0".into()));
        }
        if !self.globe.n.is_finite() || self.globe.n < 0.0 {
            return Err(ConfigError::Invalid("globe.n must be >= 0".into()));
        }

        if self.animation.frames == Some(0) {
            return Err(ConfigError::Invalid("animation.frames must be > 0".into()));
        }

        Ok(())
    }
}

fn validate_step(name: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}
