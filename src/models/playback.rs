use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::errors::PlayerError;

/// Playback rate restricted to the discrete set the player offers
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    pub const ALLOWED: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];
    pub const NORMAL: PlaybackRate = PlaybackRate(1.0);

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = PlayerError;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        // Exact comparison: only the listed values are valid.
        if Self::ALLOWED.contains(&rate) {
            Ok(Self(rate))
        } else {
            Err(PlayerError::InvalidRate { rate })
        }
    }
}

impl From<PlaybackRate> for f64 {
    fn from(rate: PlaybackRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Lifecycle phase of the current media
///
/// `Uninitialized -> Loading -> Ready <-> {Playing, Paused} -> Ended`, with
/// `Error` reachable from anywhere. Seeking is tracked separately in
/// [`PlaybackState::is_seeking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackPhase {
    Uninitialized,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Error,
}

impl PlaybackPhase {
    pub fn can_transition_to(self, next: PlaybackPhase) -> bool {
        use PlaybackPhase::*;
        if next == Error || next == self {
            return true;
        }
        match self {
            Uninitialized => next == Loading,
            Loading => next == Ready,
            Ready | Playing | Paused => matches!(next, Playing | Paused | Ended | Loading),
            // A seek back into range leaves Ended through Paused/Playing.
            Ended => matches!(next, Playing | Paused | Loading),
            Error => next == Loading,
        }
    }

    /// Whether media is loaded enough to accept transport commands
    pub fn has_media(self) -> bool {
        matches!(
            self,
            PlaybackPhase::Ready
                | PlaybackPhase::Playing
                | PlaybackPhase::Paused
                | PlaybackPhase::Ended
        )
    }
}

/// Canonical playback state, owned by the playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    /// Seconds from the start of the media
    pub current_time: f64,
    /// Seconds; `0.0` until the backend reports it
    pub duration: f64,
    /// Fraction of the media buffered, `0.0..=1.0`
    pub buffered: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: PlaybackRate,
    pub quality: String,
    pub is_fullscreen: bool,
    pub is_loading: bool,
    pub is_playing: bool,
    pub is_seeking: bool,
    pub controls_visible: bool,
    pub subtitle_language: Option<String>,
    pub error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Uninitialized,
            current_time: 0.0,
            duration: 0.0,
            buffered: 0.0,
            volume: 1.0,
            is_muted: false,
            playback_rate: PlaybackRate::NORMAL,
            quality: crate::config::defaults::DEFAULT_QUALITY.to_string(),
            is_fullscreen: false,
            is_loading: false,
            is_playing: false,
            is_seeking: false,
            controls_visible: true,
            subtitle_language: None,
            error: None,
        }
    }
}

impl PlaybackState {
    /// Whether the duration has been reported by the backend
    pub fn duration_known(&self) -> bool {
        self.duration > 0.0
    }

    /// Clamp a time into `[0, duration]`, or `[0, inf)` while the duration
    /// is unknown. Non-finite input maps to `0.0`.
    pub fn clamp_time(&self, time: f64) -> f64 {
        if !time.is_finite() {
            return 0.0;
        }
        let lower = time.max(0.0);
        if self.duration_known() {
            lower.min(self.duration)
        } else {
            lower
        }
    }

    /// Volume the listener actually hears
    pub fn audible_volume(&self) -> f64 {
        if self.is_muted { 0.0 } else { self.volume }
    }
}
