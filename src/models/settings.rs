//! Long-lived user preferences read by the controller and the input router

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::defaults::*;
use crate::models::PlaybackRate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    pub autoplay: bool,
    pub playback_rate: f64,
    pub quality: String,
    pub volume: f64,
    pub subtitles: SubtitleSettings,
    pub shortcuts: ShortcutSettings,
    pub resume_position: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubtitleSettings {
    pub enabled: bool,
    pub language: String,
    pub font_size: String,
    pub background_color: String,
    pub font_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortcutSettings {
    pub enabled: bool,
    /// Seconds added by ArrowRight
    pub skip_forward: f64,
    /// Seconds removed by ArrowLeft
    pub skip_backward: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            autoplay: DEFAULT_AUTOPLAY,
            playback_rate: DEFAULT_PLAYBACK_RATE,
            quality: DEFAULT_QUALITY.to_string(),
            volume: DEFAULT_VOLUME,
            subtitles: SubtitleSettings::default(),
            shortcuts: ShortcutSettings::default(),
            resume_position: DEFAULT_RESUME_POSITION,
        }
    }
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_SUBTITLES_ENABLED,
            language: DEFAULT_SUBTITLE_LANGUAGE.to_string(),
            font_size: DEFAULT_SUBTITLE_FONT_SIZE.to_string(),
            background_color: DEFAULT_SUBTITLE_BACKGROUND.to_string(),
            font_color: DEFAULT_SUBTITLE_FONT_COLOR.to_string(),
        }
    }
}

impl Default for ShortcutSettings {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_SHORTCUTS_ENABLED,
            skip_forward: DEFAULT_SKIP_FORWARD_SECS,
            skip_backward: DEFAULT_SKIP_BACKWARD_SECS,
        }
    }
}

impl PlayerSettings {
    /// Stored rate if it is one of the allowed values, normal speed otherwise
    pub fn initial_rate(&self) -> PlaybackRate {
        PlaybackRate::try_from(self.playback_rate).unwrap_or_else(|_| {
            warn!(
                "Ignoring stored playback rate {} (not an allowed value)",
                self.playback_rate
            );
            PlaybackRate::NORMAL
        })
    }

    /// Stored volume clamped into `[0, 1]`
    pub fn initial_volume(&self) -> f64 {
        if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        }
    }

    /// Subtitle language to show on load, if subtitles are enabled
    pub fn preferred_subtitle(&self) -> Option<&str> {
        self.subtitles
            .enabled
            .then_some(self.subtitles.language.as_str())
    }
}

impl ShortcutSettings {
    pub fn skip_forward(&self) -> f64 {
        sanitize_skip(self.skip_forward, DEFAULT_SKIP_FORWARD_SECS)
    }

    pub fn skip_backward(&self) -> f64 {
        sanitize_skip(self.skip_backward, DEFAULT_SKIP_BACKWARD_SECS)
    }
}

fn sanitize_skip(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
