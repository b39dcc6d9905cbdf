//! Configuration for the streamloop player binary
//!
//! Two sources, highest priority first:
//! 1. Command-line arguments (applied by the binary on top of this)
//! 2. TOML file resolved by [`streamloop_common::config::resolve_config_file`]
//! 3. Built-in defaults (code constants)
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [probe]
//! initial_bytes = 1024
//! ceiling_bytes = 1048576
//!
//! [render]
//! block_frames = 512
//! seconds = 10.0
//!
//! [loop]
//! enabled = true
//! begin = 0.5
//! end = 1.5
//! ```

use crate::error::{Error, Result};
use crate::playback::capacity::ProbeLimits;
use crate::playback::stream::LoopSettings;
use serde::Deserialize;
use std::path::Path;
use streamloop_common::config::{load_toml, resolve_config_file};
use tracing::info;

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub logging: LoggingConfig,
    pub probe: ProbeLimits,
    pub render: RenderConfig,
    #[serde(rename = "loop")]
    pub loop_overrides: LoopOverrides,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// How the binary pulls audio through a cursor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frames requested per `mix` call, like one host callback
    pub block_frames: usize,

    /// Seconds of output to render
    pub seconds: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_frames: 512,
            seconds: 10.0,
        }
    }
}

/// Loop properties to force over the stream's own
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LoopOverrides {
    pub enabled: Option<bool>,
    pub begin: Option<f64>,
    pub end: Option<f64>,
}

impl LoopOverrides {
    /// Layer these overrides over `base`
    pub fn apply_to(&self, base: LoopSettings) -> LoopSettings {
        LoopSettings {
            enabled: self.enabled.unwrap_or(base.enabled),
            loop_begin: self.begin.unwrap_or(base.loop_begin),
            loop_end: self.end.unwrap_or(base.loop_end),
        }
    }
}

impl PlayerConfig {
    /// Load from the resolved configuration file, or defaults when none exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let config: Self = match resolve_config_file(cli_path) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml(&path)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.probe.validate().map_err(Error::Config)?;

        if self.render.block_frames == 0 {
            return Err(Error::Config("render.block_frames must be at least 1".to_string()));
        }
        if !(self.render.seconds.is_finite() && self.render.seconds >= 0.0) {
            return Err(Error::Config(format!(
                "render.seconds must be a non-negative number, got {}",
                self.render.seconds
            )));
        }
        Ok(())
    }
}
