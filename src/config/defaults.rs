/// Configuration default values
///
/// All default values for configuration options and player settings live
/// here so they can be changed in one place.
// Service defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Checkpoint defaults
pub const DEFAULT_CHECKPOINT_CADENCE_SECS: f64 = 10.0;
pub const DEFAULT_FLUSH_ON_TEARDOWN: bool = true;
pub const DEFAULT_MAX_CONTINUOUS_STEP_SECS: f64 = 2.0;

// Controls defaults
pub const DEFAULT_CONTROLS_AUTO_HIDE_SECS: u64 = 3;

// Embed defaults
pub const DEFAULT_EMBED_ORIGIN: &str = "http://localhost";
pub const DEFAULT_SHOW_PROVIDER_CONTROLS: bool = false;

// Player settings defaults
pub const DEFAULT_AUTOPLAY: bool = false;
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.0;
pub const DEFAULT_QUALITY: &str = "auto";
pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_RESUME_POSITION: bool = true;
pub const DEFAULT_SUBTITLES_ENABLED: bool = false;
pub const DEFAULT_SUBTITLE_LANGUAGE: &str = "en";
pub const DEFAULT_SUBTITLE_FONT_SIZE: &str = "medium";
pub const DEFAULT_SUBTITLE_BACKGROUND: &str = "rgba(0, 0, 0, 0.75)";
pub const DEFAULT_SUBTITLE_FONT_COLOR: &str = "#ffffff";
pub const DEFAULT_SHORTCUTS_ENABLED: bool = true;
pub const DEFAULT_SKIP_FORWARD_SECS: f64 = 10.0;
pub const DEFAULT_SKIP_BACKWARD_SECS: f64 = 10.0;

// Input defaults
pub const VOLUME_STEP: f64 = 0.1;

// Environment
pub const ENV_PREFIX: &str = "LESSON_PLAYER_";
