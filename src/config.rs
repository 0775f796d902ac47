use anyhow::anyhow;
use directories::UserDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{MotionError, Result};

/// Displacement window bounds shared by the built-in directional detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Minimum travel along the gesture axis, and maximum drift across it.
    pub threshold: f64,
    /// Upper bound on travel along the gesture axis.
    pub range: f64,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            threshold: 40.0,
            range: 1000.0,
        }
    }
}

/// Immutable per-session engine configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub color_diff_threshold: u32,
    pub history_buffer_length: usize,
    /// Sampling stride; also accepted as `stride` in config files.
    #[serde(alias = "stride")]
    pub pixels_to_skip: usize,
    pub tick_interval_millis: u64,
    pub motion_threshold: f64,
    pub width: u32,
    pub height: u32,
    pub gestures: GestureThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            color_diff_threshold: 0x25,
            history_buffer_length: 30,
            pixels_to_skip: 7,
            tick_interval_millis: 50,
            motion_threshold: 10.0,
            width: 640,
            height: 480,
            gestures: GestureThresholds::default(),
        }
    }
}

fn default_config_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// `~/.config/camgesture/config.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    let home = UserDirs::new()?.home_dir().to_path_buf();
    Some(home.join(".config").join("camgesture").join("config.toml"))
}

impl EngineConfig {
    pub fn from_toml_str(txt: &str) -> Result<Self> {
        let cfg: EngineConfig =
            toml::from_str(txt).map_err(|e| MotionError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let cfg = read_config(path).map_err(|reason| MotionError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        })?;
        cfg.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Loads the user's config file if there is one, else the bundled defaults.
    pub fn load_or_default() -> Result<Self> {
        if let Some(path) = default_config_path()
            && path.exists()
        {
            info!("using config {}", path.display());
            return Self::load(&path);
        }
        Self::from_toml_str(default_config_text())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pixels_to_skip == 0 {
            return Err(MotionError::InvalidStride);
        }
        if self.history_buffer_length == 0 {
            return Err(MotionError::InvalidHistoryLength);
        }
        if self.width == 0 || self.height == 0 {
            return Err(MotionError::InvalidConfig(format!(
                "frame dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.motion_threshold.is_finite() {
            return Err(MotionError::InvalidConfig(
                "motion_threshold must be a finite number".into(),
            ));
        }
        let g = &self.gestures;
        if !(g.threshold >= 0.0 && g.threshold < g.range) {
            return Err(MotionError::InvalidConfig(format!(
                "gestures.threshold ({}) must be in [0, gestures.range ({}))",
                g.threshold, g.range
            )));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let txt = fs::read_to_string(path).map_err(|e| anyhow!("read failed: {e}"))?;
    toml::from_str(&txt).map_err(|e| anyhow!("parse failed: {e}"))
}
