use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position record returned by the progress service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedPosition {
    pub position: f64,
    pub duration: f64,
}

impl SavedPosition {
    /// Whether this position is worth resuming to for media of `duration`
    /// seconds: past the start and before the end.
    pub fn resumable_within(&self, duration: f64) -> bool {
        self.position.is_finite() && self.position > 0.0 && self.position < duration
    }
}

/// Snapshot handed to the progress service by the checkpointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub lesson_id: String,
    /// Current position, which may be behind earlier checkpoints after a seek
    pub position: f64,
    pub duration: f64,
    /// Media playback time accumulated by the session when captured
    pub captured_at_media_time: f64,
}

impl Checkpoint {
    pub fn saved_position(&self) -> SavedPosition {
        SavedPosition {
            position: self.position,
            duration: self.duration,
        }
    }
}

/// User-created marker at a point in a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub lesson_id: String,
    /// Media time in seconds
    pub timestamp: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(lesson_id: impl Into<String>, timestamp: f64) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            timestamp,
            created_at: Utc::now(),
        }
    }
}
