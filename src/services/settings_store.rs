//! Player preferences persisted as a JSON document

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::traits::SettingsStore;
use crate::errors::PlayerResult;
use crate::models::PlayerSettings;

pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    /// Missing file means defaults; unknown fields are ignored and missing
    /// ones take their defaults.
    async fn load(&self) -> PlayerResult<PlayerSettings> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                debug!("Loading player settings from {}", self.path.display());
                Ok(serde_json::from_str(&contents)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No player settings at {}, using defaults",
                    self.path.display()
                );
                Ok(PlayerSettings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, settings: &PlayerSettings) -> PlayerResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, contents).await?;
        debug!("Saved player settings to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load().await.unwrap(), PlayerSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("nested/settings.json"));

        let mut settings = PlayerSettings::default();
        settings.playback_rate = 1.5;
        settings.shortcuts.enabled = false;
        store.save(&settings).await.unwrap();

        assert_eq!(store.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_partial_document_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"autoplay": true, "shortcuts": {"skipForward": 5}}"#)
            .await
            .unwrap();

        let settings = JsonFileSettingsStore::new(&path).load().await.unwrap();
        assert!(settings.autoplay);
        assert_eq!(settings.shortcuts.skip_forward, 5.0);
        assert_eq!(settings.shortcuts.skip_backward, 10.0);
        assert!(settings.resume_position);
    }

    #[tokio::test]
    async fn test_malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = JsonFileSettingsStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, crate::errors::PlayerError::SettingsFormat(_)));
    }
}
