// SPDX-License-Identifier: GPL-3.0-only

//! Read-only pipeline configuration
//!
//! Loaded from JSON at startup. Every field has a default, so a partial file
//! (or no file at all) is valid. Nothing is ever written back.

use crate::backends::camera::Resolution;
use crate::constants::{self, engine, timing};
use crate::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Capture device to open at surface creation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSource {
    /// Animated test pattern
    #[default]
    Synthetic,
    /// A still image streamed at the configured frame rate
    ImageFile { path: PathBuf },
}

/// Compute engine bound to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// Global Reinhard tone mapping
    ReinhardGlobal {
        #[serde(default = "default_key")]
        key: f32,
        #[serde(default = "default_saturation")]
        saturation: f32,
    },
    /// Copies the raw texture unchanged
    Passthrough,
}

fn default_key() -> f32 {
    engine::DEFAULT_KEY
}

fn default_saturation() -> f32 {
    engine::DEFAULT_SATURATION
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::ReinhardGlobal {
            key: engine::DEFAULT_KEY,
            saturation: engine::DEFAULT_SATURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture resolution requested at surface creation
    pub camera_resolution: Resolution,
    /// Display size used until the host reports one
    pub display_resolution: Resolution,
    /// How often the engine rebuilds its mapping statistics (seconds)
    pub recompute_interval_secs: f32,
    /// Start with the HDR stage enabled
    pub process_hdr: bool,
    pub camera: CameraSource,
    /// Built-in camera frame rate
    pub frame_rate: u32,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_resolution: constants::DEFAULT_CAMERA_RESOLUTION,
            display_resolution: constants::DEFAULT_DISPLAY_RESOLUTION,
            recompute_interval_secs: timing::DEFAULT_RECOMPUTE_INTERVAL_SECS,
            process_hdr: false,
            camera: CameraSource::default(),
            frame_rate: timing::DEFAULT_CAMERA_FRAME_RATE,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/hdr-camera/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(constants::APP_DIR_NAME).join(constants::CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from the default location if `None`
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => {
                    debug!("No configuration file, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn load_from(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json(text: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline can't start with
    pub fn validate(&self) -> PipelineResult<()> {
        if self.camera_resolution.is_empty() {
            return Err(PipelineError::Config(format!(
                "camera_resolution {} has a zero dimension",
                self.camera_resolution
            )));
        }
        if self.display_resolution.is_empty() {
            return Err(PipelineError::Config(format!(
                "display_resolution {} has a zero dimension",
                self.display_resolution
            )));
        }
        if !self.recompute_interval_secs.is_finite() || self.recompute_interval_secs < 0.0 {
            return Err(PipelineError::Config(format!(
                "recompute_interval_secs must be a non-negative number, got {}",
                self.recompute_interval_secs
            )));
        }
        if self.frame_rate == 0 {
            return Err(PipelineError::Config("frame_rate must be at least 1".into()));
        }
        if let EngineConfig::ReinhardGlobal { key, saturation } = self.engine
            && !(key.is_finite() && key > 0.0 && saturation.is_finite() && saturation > 0.0)
        {
            return Err(PipelineError::Config(format!(
                "reinhard key ({}) and saturation ({}) must be positive",
                key, saturation
            )));
        }
        Ok(())
    }
}
