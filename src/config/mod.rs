use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Runtime configuration for the player controller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
}

/// External service endpoints
///
/// An endpoint left unset falls back to an in-memory store, which is what
/// the CLI uses for dry runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the progress service (`GET/PUT {base}/progress/{lessonId}`)
    pub progress_url: Option<Url>,
    /// Base URL of the activity tracking service (`POST {base}/activity`)
    pub activity_url: Option<Url>,
    /// Base URL of the bookmark service (`POST {base}/bookmarks`)
    pub bookmark_url: Option<Url>,
    /// Bearer token attached to every request
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
}

/// Position checkpoint policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Seconds of media playback time between checkpoint writes
    #[serde(default = "default_cadence")]
    pub cadence: f64,
    /// Write a final checkpoint on teardown when the position moved
    #[serde(default = "default_flush_on_teardown")]
    pub flush_on_teardown: bool,
    /// Largest timeupdate delta still counted as continuous playback
    #[serde(default = "default_max_continuous_step")]
    pub max_continuous_step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "default_auto_hide", with = "duration_serde::duration")]
    pub auto_hide: Duration,
}

/// Parameters passed to embedded providers at construction time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    #[serde(default = "default_embed_origin")]
    pub origin: String,
    #[serde(default = "default_show_provider_controls")]
    pub show_provider_controls: bool,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

fn default_cadence() -> f64 {
    DEFAULT_CHECKPOINT_CADENCE_SECS
}

fn default_flush_on_teardown() -> bool {
    DEFAULT_FLUSH_ON_TEARDOWN
}

fn default_max_continuous_step() -> f64 {
    DEFAULT_MAX_CONTINUOUS_STEP_SECS
}

fn default_auto_hide() -> Duration {
    Duration::from_secs(DEFAULT_CONTROLS_AUTO_HIDE_SECS)
}

fn default_embed_origin() -> String {
    DEFAULT_EMBED_ORIGIN.to_string()
}

fn default_show_provider_controls() -> bool {
    DEFAULT_SHOW_PROVIDER_CONTROLS
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            progress_url: None,
            activity_url: None,
            bookmark_url: None,
            api_token: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            flush_on_teardown: default_flush_on_teardown(),
            max_continuous_step: default_max_continuous_step(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            auto_hide: default_auto_hide(),
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            origin: default_embed_origin(),
            show_provider_controls: default_show_provider_controls(),
        }
    }
}

impl Config {
    /// Load configuration layered as defaults, then the TOML file (if it
    /// exists), then `LESSON_PLAYER_` environment variables.
    ///
    /// Nested keys use `__` in the environment, e.g.
    /// `LESSON_PLAYER_CHECKPOINT__CADENCE=15`.
    pub fn load(config_file: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if Path::new(config_file).exists() {
            info!("Loading configuration from {}", config_file);
            figment = figment.merge(Toml::file(config_file));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the controller cannot operate with
    pub fn validate(&self) -> Result<()> {
        if !(self.checkpoint.cadence.is_finite() && self.checkpoint.cadence > 0.0) {
            anyhow::bail!(
                "checkpoint.cadence must be a positive number of seconds, got {}",
                self.checkpoint.cadence
            );
        }
        if !(self.checkpoint.max_continuous_step.is_finite()
            && self.checkpoint.max_continuous_step > 0.0)
        {
            anyhow::bail!(
                "checkpoint.max_continuous_step must be positive, got {}",
                self.checkpoint.max_continuous_step
            );
        }
        Ok(())
    }
}
