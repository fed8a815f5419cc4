use serde::{Deserialize, Serialize};
use strum::Display;
use url::Url;

/// Playback backend family a reference resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provider {
    /// Directly decodable media played by a media element we own
    Native,
    /// Third-party iframe player
    Embedded,
}

/// Subtitle file attached to a native media reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub language_code: String,
    pub subtitle_url: String,
}

/// Raw lesson media as stored by the course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub url: String,
    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
}

impl MediaReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subtitles: Vec::new(),
        }
    }

    pub fn with_subtitles(mut self, subtitles: Vec<SubtitleTrack>) -> Self {
        self.subtitles = subtitles;
        self
    }
}

/// Result of classifying a [`MediaReference`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSource {
    pub provider: Provider,
    /// Canonical embed URL for embedded sources, the media URL for native ones
    pub embed_url: String,
    pub thumbnail_url: Option<String>,
    pub provider_id: Option<String>,
}

impl ResolvedSource {
    pub fn is_embedded(&self) -> bool {
        self.provider == Provider::Embedded
    }

    /// Parsed form of `embed_url`, if it is an absolute URL
    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.embed_url).ok()
    }
}
