//! Render options with TOML preset support.
//!
//! All sub-structs use `#[serde(default)]` so partial TOML files (e.g.
//! only overriding `[ibl]`) work correctly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SoftrasError;
use crate::ibl::IblConfig;
use crate::rasterizer::NormalMode;

/// Output framebuffer dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Framebuffer width in pixels.
    pub width: usize,
    /// Framebuffer height in pixels.
    pub height: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            width: 720,
            height: 576,
        }
    }
}

/// Directional light parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingOptions {
    /// Direction the light travels.
    pub direction: [f64; 3],
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            direction: [0.0, 0.0, -1.0],
        }
    }
}

/// Sizes and cache location for the IBL precomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IblOptions {
    /// Face size of the irradiance cubemap.
    pub irradiance_size: usize,
    /// Base face size of the prefilter cubemap.
    pub prefilter_size: usize,
    /// Side length of the BRDF lookup table.
    pub brdf_size: usize,
    /// Directory holding cached IBL textures, keyed by environment hash.
    pub cache_dir: PathBuf,
}

impl Default for IblOptions {
    fn default() -> Self {
        let config = IblConfig::default();
        Self {
            irradiance_size: config.irradiance_size,
            prefilter_size: config.prefilter_size,
            brdf_size: config.brdf_size,
            cache_dir: crate::ibl::default_cache_dir(),
        }
    }
}

impl IblOptions {
    /// The pass configuration these options describe.
    pub fn config(&self) -> IblConfig {
        IblConfig {
            irradiance_size: self.irradiance_size,
            prefilter_size: self.prefilter_size,
            brdf_size: self.brdf_size,
        }
    }
}

/// Top-level render options container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output dimensions.
    pub output: OutputOptions,
    /// Light parameters.
    pub lighting: LightingOptions,
    /// Per-pixel normal selection.
    pub normal_mode: NormalMode,
    /// IBL precomputation parameters.
    pub ibl: IblOptions,
}

impl RenderOptions {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, SoftrasError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SoftrasError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), SoftrasError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SoftrasError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
