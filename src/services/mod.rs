//! External services and the background writers that feed them
//!
//! The [`ProgressStore`], [`ActivitySink`] and [`BookmarkStore`] traits are
//! the seams to the outside world. [`PositionCheckpointer`] and
//! [`ActivityRecorder`] own the background tasks that write to them without
//! ever blocking playback.

use std::sync::Arc;
use tracing::info;

pub mod activity;
pub mod checkpoint;
pub mod http;
pub mod memory;
pub mod settings_store;
pub mod traits;

pub use activity::ActivityRecorder;
pub use checkpoint::PositionCheckpointer;
pub use http::{HttpActivitySink, HttpBookmarkStore, HttpProgressStore, ServiceClient};
pub use memory::{InMemoryActivitySink, InMemoryBookmarkStore, InMemoryProgressStore};
pub use settings_store::JsonFileSettingsStore;
pub use traits::{ActivitySink, BookmarkStore, ProgressStore, SettingsStore};

use crate::config::ServicesConfig;
use crate::errors::ServiceResult;

/// Service handles injected into a player controller
#[derive(Clone)]
pub struct ServiceSet {
    pub progress: Arc<dyn ProgressStore>,
    pub activity: Arc<dyn ActivitySink>,
    pub bookmarks: Arc<dyn BookmarkStore>,
}

impl ServiceSet {
    /// HTTP clients for configured endpoints, in-memory stores for the rest
    pub fn from_config(config: &ServicesConfig) -> ServiceResult<Self> {
        let client = ServiceClient::new(config.request_timeout, config.api_token.clone())?;

        let progress: Arc<dyn ProgressStore> = match &config.progress_url {
            Some(base) => Arc::new(HttpProgressStore::new(base.clone(), client.clone())),
            None => {
                info!("Progress service not configured, keeping positions in memory");
                Arc::new(InMemoryProgressStore::new())
            }
        };
        let activity: Arc<dyn ActivitySink> = match &config.activity_url {
            Some(base) => Arc::new(HttpActivitySink::new(base.clone(), client.clone())),
            None => {
                info!("Activity service not configured, keeping events in memory");
                Arc::new(InMemoryActivitySink::new())
            }
        };
        let bookmarks: Arc<dyn BookmarkStore> = match &config.bookmark_url {
            Some(base) => Arc::new(HttpBookmarkStore::new(base.clone(), client)),
            None => {
                info!("Bookmark service not configured, keeping bookmarks in memory");
                Arc::new(InMemoryBookmarkStore::new())
            }
        };

        Ok(Self {
            progress,
            activity,
            bookmarks,
        })
    }
}

/// In-memory services with their concrete handles kept for inspection
#[derive(Clone, Default)]
pub struct InMemoryServices {
    pub progress: Arc<InMemoryProgressStore>,
    pub activity: Arc<InMemoryActivitySink>,
    pub bookmarks: Arc<InMemoryBookmarkStore>,
}

impl InMemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_set(&self) -> ServiceSet {
        ServiceSet {
            progress: self.progress.clone(),
            activity: self.activity.clone(),
            bookmarks: self.bookmarks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_services_fall_back_to_memory() {
        let services = ServiceSet::from_config(&ServicesConfig::default());
        assert!(services.is_ok());
    }
}
