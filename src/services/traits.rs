//! Seams to the external services the player talks to

use async_trait::async_trait;

use crate::errors::{PlayerResult, ServiceResult};
use crate::models::{ActivityEvent, Bookmark, Checkpoint, PlayerSettings, SavedPosition};

/// Lesson position storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Saved position for a lesson, `None` when nothing was stored yet
    async fn load(&self, lesson_id: &str) -> ServiceResult<Option<SavedPosition>>;

    /// Upsert the position for `checkpoint.lesson_id`
    async fn save(&self, checkpoint: &Checkpoint) -> ServiceResult<()>;
}

/// Append-only activity log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn post(&self, event: &ActivityEvent) -> ServiceResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn create(&self, bookmark: &Bookmark) -> ServiceResult<()>;
}

/// Persistence for user player preferences
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> PlayerResult<PlayerSettings>;

    async fn save(&self, settings: &PlayerSettings) -> PlayerResult<()>;
}
