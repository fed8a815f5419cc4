//! Classification of raw lesson video references
//!
//! A reference either matches one of the embedded provider's URL shapes, in
//! which case the provider-assigned video ID is extracted and the canonical
//! embed and thumbnail URLs are derived from it, or it is treated as a
//! direct media URL for the native backend. Resolution is pure: the same
//! input always yields the same output.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{MediaReference, Provider, ResolvedSource};

const EMBED_BASE: &str = "https://www.youtube.com/embed/";
const THUMBNAIL_BASE: &str = "https://img.youtube.com/vi/";
const THUMBNAIL_FILE: &str = "hqdefault.jpg";

/// Watch-page, short-link and embed-path forms, each capturing the video ID
fn provider_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(?:https?://)?(?i:(?:www\.|m\.|music\.)?youtube(?:-nocookie)?\.com)/watch/?\?(?:[^#]*&)?v=([A-Za-z0-9_-]+)",
            r"^(?:https?://)?(?i:youtu\.be)/([A-Za-z0-9_-]+)",
            r"^(?:https?://)?(?i:(?:www\.|m\.)?youtube(?:-nocookie)?\.com)/(?:embed|v|shorts|live)/([A-Za-z0-9_-]+)",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Stateless resolver for media references
pub struct SourceResolver;

impl SourceResolver {
    /// Classify a raw reference
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lesson_player::sources::SourceResolver;
    /// use lesson_player::models::Provider;
    ///
    /// let resolved = SourceResolver::resolve("https://www.youtube.com/watch?v=abc123");
    /// assert_eq!(resolved.provider, Provider::Embedded);
    /// assert_eq!(resolved.provider_id.as_deref(), Some("abc123"));
    ///
    /// let resolved = SourceResolver::resolve("https://cdn.example.com/lesson.mp4");
    /// assert_eq!(resolved.provider, Provider::Native);
    /// ```
    pub fn resolve(reference: &str) -> ResolvedSource {
        let trimmed = reference.trim();

        match Self::extract_provider_id(trimmed) {
            Some(id) => {
                debug!("Resolved '{}' to embedded provider id {}", trimmed, id);
                ResolvedSource {
                    provider: Provider::Embedded,
                    embed_url: Self::embed_url_for(&id),
                    thumbnail_url: Some(Self::thumbnail_url_for(&id)),
                    provider_id: Some(id),
                }
            }
            None => ResolvedSource {
                provider: Provider::Native,
                embed_url: trimmed.to_string(),
                thumbnail_url: None,
                provider_id: None,
            },
        }
    }

    /// Classify a stored media reference
    pub fn resolve_reference(reference: &MediaReference) -> ResolvedSource {
        Self::resolve(&reference.url)
    }

    /// Provider-assigned video ID, if the reference is an embedded-provider URL
    pub fn extract_provider_id(reference: &str) -> Option<String> {
        provider_patterns().iter().find_map(|pattern| {
            pattern
                .captures(reference)
                .and_then(|captures| captures.get(1))
                .map(|id| id.as_str().to_string())
        })
    }

    pub fn embed_url_for(provider_id: &str) -> String {
        format!("{EMBED_BASE}{provider_id}")
    }

    pub fn thumbnail_url_for(provider_id: &str) -> String {
        format!("{THUMBNAIL_BASE}{provider_id}/{THUMBNAIL_FILE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.youtube.com/watch?v=abc123", "abc123")]
    #[case("http://youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ")]
    #[case("https://www.youtube.com/watch?feature=share&v=x_Y-z9", "x_Y-z9")]
    #[case("www.youtube.com/watch?v=abc123", "abc123")]
    #[case("https://m.youtube.com/watch?v=abc123", "abc123")]
    #[case("https://youtu.be/abc123", "abc123")]
    #[case("https://youtu.be/abc123?si=tracking", "abc123")]
    #[case("https://www.youtube.com/embed/abc123", "abc123")]
    #[case("https://www.youtube-nocookie.com/embed/abc123?rel=0", "abc123")]
    #[case("https://www.youtube.com/shorts/abc123", "abc123")]
    #[case("  https://WWW.YOUTUBE.COM/watch?v=abc123  ", "abc123")]
    fn test_embedded_golden_cases(#[case] reference: &str, #[case] id: &str) {
        let resolved = SourceResolver::resolve(reference);
        assert_eq!(resolved.provider, Provider::Embedded);
        assert_eq!(resolved.provider_id.as_deref(), Some(id));
        assert_eq!(
            resolved.embed_url,
            format!("https://www.youtube.com/embed/{id}")
        );
        assert_eq!(
            resolved.thumbnail_url,
            Some(format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"))
        );
    }

    #[rstest]
    #[case("https://cdn.example.com/lessons/intro.mp4")]
    #[case("https://example.com/watch?v=abc123")]
    #[case("https://www.youtube.com/channel/UC123")]
    #[case("/media/local.webm")]
    #[case("")]
    #[case("not a url at all")]
    fn test_native_fallback(#[case] reference: &str) {
        let resolved = SourceResolver::resolve(reference);
        assert_eq!(resolved.provider, Provider::Native);
        assert_eq!(resolved.embed_url, reference.trim());
        assert_eq!(resolved.thumbnail_url, None);
        assert_eq!(resolved.provider_id, None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let a = SourceResolver::resolve("https://youtu.be/abc123");
        let b = SourceResolver::resolve("https://www.youtube.com/watch?v=abc123");
        assert_eq!(a, b);
        assert_eq!(a, SourceResolver::resolve("https://youtu.be/abc123"));
    }

    #[test]
    fn test_resolve_reference_uses_url() {
        let reference = MediaReference::new("https://youtu.be/abc123");
        assert!(SourceResolver::resolve_reference(&reference).is_embedded());
    }
}
