//! Adapter over a third-party iframe player
//!
//! Only the parameters baked into the iframe URL are guaranteed to take
//! effect. Runtime commands are posted to the frame on a best-effort basis
//! and the frame reports nothing back beyond its own readiness, so the
//! adapter keeps an estimate of the media time for bookmarks.

use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::{AdapterEvent, EventSink, Fidelity, PlatformOp, SourceAdapter};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::{PlaybackRate, Provider, ResolvedSource};

/// Commands the embedded player's message API understands
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedCommand {
    Play,
    Pause,
    SeekTo(f64),
    SetVolume(f64),
    Mute,
    Unmute,
    SetPlaybackRate(f64),
    SetQuality(String),
}

/// Host frame for the embedded player
pub trait EmbedHost: Send {
    /// Create the iframe. The host reports readiness and failures on `events`.
    fn mount(&mut self, src: &Url, events: EventSink) -> PlatformResult<()>;

    /// Post a command to the frame; `false` when it could not be delivered
    fn post(&mut self, command: EmbedCommand) -> bool;

    fn request_fullscreen(&mut self) -> PlatformOp;

    fn exit_fullscreen(&mut self) -> PlatformOp;

    fn unmount(&mut self);
}

/// Construction-time parameters for the iframe URL
#[derive(Debug, Clone)]
pub struct EmbedParams {
    pub autoplay: bool,
    pub origin: String,
    pub show_controls: bool,
    pub start_at: Option<f64>,
}

/// Last known media time and the instant it was observed
#[derive(Debug, Clone, Copy)]
struct PositionAnchor {
    time: f64,
    at: Instant,
    playing: bool,
    rate: f64,
}

impl PositionAnchor {
    fn estimate(&self) -> f64 {
        if self.playing {
            self.time + self.at.elapsed().as_secs_f64() * self.rate
        } else {
            self.time
        }
    }
}

pub struct EmbeddedAdapter {
    host: Box<dyn EmbedHost>,
    src: Option<Url>,
    events: EventSink,
    anchor: PositionAnchor,
    mounted: bool,
    detached: bool,
}

impl EmbeddedAdapter {
    /// Build the iframe URL. Construction never fails; a URL that cannot be
    /// built is reported as an error event when loading starts.
    pub fn new(
        host: Box<dyn EmbedHost>,
        source: &ResolvedSource,
        params: EmbedParams,
        events: EventSink,
    ) -> Self {
        let src = match Self::embed_src(source, &params) {
            Ok(src) => Some(src),
            Err(e) => {
                warn!("Cannot build embed URL from '{}': {}", source.embed_url, e);
                None
            }
        };

        let start = params.start_at.unwrap_or(0.0);
        Self {
            host,
            src,
            events,
            anchor: PositionAnchor {
                time: start,
                at: Instant::now(),
                playing: false,
                rate: PlaybackRate::NORMAL.value(),
            },
            mounted: false,
            detached: false,
        }
    }

    /// Iframe URL with the provider's query parameters applied
    pub fn embed_src(source: &ResolvedSource, params: &EmbedParams) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&source.embed_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("autoplay", if params.autoplay { "1" } else { "0" })
                .append_pair("enablejsapi", "1")
                .append_pair("origin", &params.origin)
                .append_pair("controls", if params.show_controls { "1" } else { "0" })
                .append_pair("rel", "0")
                .append_pair("modestbranding", "1")
                .append_pair("playsinline", "1");
            if let Some(start) = params.start_at.filter(|s| s.is_finite() && *s >= 1.0) {
                query.append_pair("start", &(start.floor() as u64).to_string());
            }
        }
        Ok(url)
    }

    pub fn src(&self) -> Option<&Url> {
        self.src.as_ref()
    }

    fn post(&mut self, command: EmbedCommand) {
        if self.detached || !self.mounted {
            return;
        }
        debug!("Posting {:?} to embedded player", command);
        if !self.host.post(command.clone()) {
            debug!("Embedded player did not accept {:?}", command);
        }
    }

    fn re_anchor(&mut self, time: f64, playing: bool) {
        self.anchor.time = time;
        self.anchor.at = Instant::now();
        self.anchor.playing = playing;
    }
}

impl SourceAdapter for EmbeddedAdapter {
    fn provider(&self) -> Provider {
        Provider::Embedded
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::LIFECYCLE_ONLY
    }

    fn load(&mut self) {
        if self.detached {
            return;
        }
        if self.mounted {
            self.host.unmount();
            self.mounted = false;
        }
        let Some(src) = self.src.clone() else {
            self.events.emit(AdapterEvent::Error {
                message: "embed URL could not be built".to_string(),
            });
            return;
        };

        match self.host.mount(&src, self.events.clone()) {
            Ok(()) => {
                self.mounted = true;
                // The frame never reports metadata; duration stays unknown.
                self.events.emit(AdapterEvent::Loaded { duration: 0.0 });
            }
            Err(e) => {
                warn!("Embedded player failed to mount: {}", e);
                self.events.emit(AdapterEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    fn play(&mut self) -> PlatformOp {
        if self.detached {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        let position = self.anchor.estimate();
        self.re_anchor(position, true);
        self.post(EmbedCommand::Play);
        // Delivery cannot be observed, so the request counts as accepted.
        PlatformOp::ready(Ok(()))
    }

    fn pause(&mut self) {
        let position = self.anchor.estimate();
        self.re_anchor(position, false);
        self.post(EmbedCommand::Pause);
    }

    fn seek(&mut self, time: f64) {
        let playing = self.anchor.playing;
        self.re_anchor(time, playing);
        self.post(EmbedCommand::SeekTo(time));
    }

    fn set_volume(&mut self, volume: f64) {
        self.post(EmbedCommand::SetVolume((volume * 100.0).round()));
    }

    fn set_muted(&mut self, muted: bool) {
        self.post(if muted {
            EmbedCommand::Mute
        } else {
            EmbedCommand::Unmute
        });
    }

    fn set_playback_rate(&mut self, rate: PlaybackRate) {
        let position = self.anchor.estimate();
        let playing = self.anchor.playing;
        self.re_anchor(position, playing);
        self.anchor.rate = rate.value();
        self.post(EmbedCommand::SetPlaybackRate(rate.value()));
    }

    fn set_quality(&mut self, label: &str) {
        self.post(EmbedCommand::SetQuality(label.to_string()));
    }

    fn request_fullscreen(&mut self) -> PlatformOp {
        if self.detached || !self.mounted {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        self.host.request_fullscreen()
    }

    fn exit_fullscreen(&mut self) -> PlatformOp {
        if self.detached || !self.mounted {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        self.host.exit_fullscreen()
    }

    fn position_hint(&self) -> Option<f64> {
        Some(self.anchor.estimate().max(0.0))
    }

    fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        if self.mounted {
            self.host.unmount();
            self.mounted = false;
        }
    }
}

impl Drop for EmbeddedAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::{SimulatedEmbedHost, SimulatedEmbedHandle};
    use crate::adapters::{EventSubscription, subscription};
    use crate::sources::SourceResolver;
    use std::time::Duration;

    fn params() -> EmbedParams {
        EmbedParams {
            autoplay: false,
            origin: "https://lessons.example.com".to_string(),
            show_controls: false,
            start_at: None,
        }
    }

    fn adapter(params: EmbedParams) -> (EmbeddedAdapter, SimulatedEmbedHandle, EventSubscription) {
        let (host, handle) = SimulatedEmbedHost::new();
        let (sink, events) = subscription();
        let source = SourceResolver::resolve("https://youtu.be/abc123");
        (
            EmbeddedAdapter::new(Box::new(host), &source, params, sink),
            handle,
            events,
        )
    }

    #[test]
    fn test_embed_src_carries_construction_params() {
        let source = SourceResolver::resolve("https://www.youtube.com/watch?v=abc123");
        let mut p = params();
        p.autoplay = true;
        p.start_at = Some(42.7);

        let url = EmbeddedAdapter::embed_src(&source, &p).unwrap();
        assert_eq!(url.path(), "/embed/abc123");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("autoplay".into(), "1".into())));
        assert!(pairs.contains(&("enablejsapi".into(), "1".into())));
        assert!(pairs.contains(&("origin".into(), "https://lessons.example.com".into())));
        assert!(pairs.contains(&("controls".into(), "0".into())));
        assert!(pairs.contains(&("start".into(), "42".into())));
    }

    #[tokio::test]
    async fn test_load_mounts_and_reports_unknown_duration() {
        let (mut adapter, handle, mut events) = adapter(params());
        adapter.load();

        assert!(handle.is_mounted());
        assert_eq!(events.try_recv(), Some(AdapterEvent::Loaded { duration: 0.0 }));
        assert_eq!(adapter.fidelity(), Fidelity::LIFECYCLE_ONLY);
    }

    #[tokio::test]
    async fn test_mount_failure_is_an_error_event() {
        let (mut adapter, handle, mut events) = adapter(params());
        handle.fail_mount("frame blocked");
        adapter.load();

        assert!(matches!(events.try_recv(), Some(AdapterEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_commands_are_best_effort() {
        let (mut adapter, handle, _events) = adapter(params());
        adapter.load();
        handle.set_delivering(false);

        // Undeliverable commands still resolve; the frame gives no feedback.
        assert_eq!(adapter.play().await, Ok(()));
        handle.set_delivering(true);
        adapter.seek(12.0);
        adapter.set_muted(true);

        assert_eq!(
            handle.delivered(),
            vec![EmbedCommand::SeekTo(12.0), EmbedCommand::Mute]
        );
    }

    #[tokio::test]
    async fn test_subtitles_are_unsupported() {
        let (mut adapter, _handle, _events) = adapter(params());
        adapter.load();
        assert!(adapter.subtitle_languages().is_empty());
        assert!(matches!(
            adapter.set_subtitle(Some("en")),
            Err(PlatformError::Unsupported { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_estimate_follows_local_commands() {
        let mut p = params();
        p.start_at = Some(30.0);
        let (mut adapter, _handle, _events) = adapter(p);
        adapter.load();
        assert_eq!(adapter.position_hint(), Some(30.0));

        let _ = adapter.play();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((adapter.position_hint().unwrap() - 35.0).abs() < 1e-6);

        adapter.set_playback_rate(PlaybackRate::try_from(2.0).unwrap());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((adapter.position_hint().unwrap() - 45.0).abs() < 1e-6);

        adapter.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((adapter.position_hint().unwrap() - 45.0).abs() < 1e-6);

        adapter.seek(10.0);
        assert_eq!(adapter.position_hint(), Some(10.0));
    }

    #[tokio::test]
    async fn test_detach_unmounts_once() {
        let (mut adapter, handle, _events) = adapter(params());
        adapter.load();
        adapter.detach();
        adapter.detach();

        assert!(!handle.is_mounted());
        assert_eq!(handle.unmount_count(), 1);
    }
}
