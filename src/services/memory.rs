//! In-memory service implementations
//!
//! Used when an endpoint is not configured, by the CLI dry runs and by the
//! tests, which read back what was written and can make writes fail.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::traits::{ActivitySink, BookmarkStore, ProgressStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{ActivityEvent, ActivityType, Bookmark, Checkpoint, SavedPosition};

fn unavailable(service: &str) -> ServiceError {
    ServiceError::status(service, 503, "unavailable")
}

#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    positions: RwLock<HashMap<String, SavedPosition>>,
    writes: RwLock<Vec<Checkpoint>>,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(lesson_id: &str, position: SavedPosition) -> Self {
        let positions = HashMap::from([(lesson_id.to_string(), position)]);
        Self {
            positions: RwLock::new(positions),
            ..Self::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every successful write, in order
    pub async fn writes(&self) -> Vec<Checkpoint> {
        self.writes.read().await.clone()
    }

    pub async fn position(&self, lesson_id: &str) -> Option<SavedPosition> {
        self.positions.read().await.get(lesson_id).copied()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn load(&self, lesson_id: &str) -> ServiceResult<Option<SavedPosition>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(unavailable("progress"));
        }
        Ok(self.position(lesson_id).await)
    }

    async fn save(&self, checkpoint: &Checkpoint) -> ServiceResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable("progress"));
        }
        self.positions
            .write()
            .await
            .insert(checkpoint.lesson_id.clone(), checkpoint.saved_position());
        self.writes.write().await.push(checkpoint.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryActivitySink {
    events: RwLock<Vec<ActivityEvent>>,
    fail: AtomicBool,
}

impl InMemoryActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<ActivityEvent> {
        self.events.read().await.clone()
    }

    pub async fn types(&self) -> Vec<ActivityType> {
        self.events
            .read()
            .await
            .iter()
            .map(ActivityEvent::activity_type)
            .collect()
    }
}

#[async_trait]
impl ActivitySink for InMemoryActivitySink {
    async fn post(&self, event: &ActivityEvent) -> ServiceResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("activity"));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBookmarkStore {
    bookmarks: RwLock<Vec<Bookmark>>,
}

impl InMemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.read().await.clone()
    }
}

#[async_trait]
impl BookmarkStore for InMemoryBookmarkStore {
    async fn create(&self, bookmark: &Bookmark) -> ServiceResult<()> {
        self.bookmarks.write().await.push(bookmark.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_store_upserts() {
        let store = InMemoryProgressStore::with_position(
            "lesson-1",
            SavedPosition {
                position: 5.0,
                duration: 60.0,
            },
        );
        assert_eq!(store.load("lesson-1").await.unwrap().unwrap().position, 5.0);

        let checkpoint = Checkpoint {
            lesson_id: "lesson-1".to_string(),
            position: 20.0,
            duration: 60.0,
            captured_at_media_time: 10.0,
        };
        store.save(&checkpoint).await.unwrap();
        assert_eq!(store.position("lesson-1").await.unwrap().position, 20.0);
        assert_eq!(store.writes().await, vec![checkpoint]);
        assert_eq!(store.load("lesson-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_can_be_injected() {
        let store = InMemoryProgressStore::new();
        store.set_fail_loads(true);
        assert!(store.load("lesson-1").await.is_err());

        let sink = InMemoryActivitySink::new();
        sink.set_fail(true);
        let context = crate::models::SessionContext::new("student", "lesson-1");
        let event = ActivityEvent::new(&context, crate::models::Activity::Start { position: 0.0 });
        assert!(sink.post(&event).await.is_err());
        assert!(sink.events().await.is_empty());
    }
}
