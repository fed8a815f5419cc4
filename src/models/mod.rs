//! Data model shared by the controller, the adapters and the services

pub mod activity;
pub mod playback;
pub mod progress;
pub mod settings;
pub mod source;

pub use activity::{Activity, ActivityEvent, ActivityType, SessionContext};
pub use playback::{PlaybackPhase, PlaybackRate, PlaybackState};
pub use progress::{Bookmark, Checkpoint, SavedPosition};
pub use settings::{PlayerSettings, ShortcutSettings, SubtitleSettings};
pub use source::{MediaReference, Provider, ResolvedSource, SubtitleTrack};
