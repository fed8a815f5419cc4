//! Adapter over a media element the player owns
//!
//! Every command goes straight to the element and the element reports every
//! lifecycle change back, so this backend has full fidelity.

use tracing::{debug, warn};

use super::{AdapterEvent, EventSink, Fidelity, PlatformOp, SourceAdapter};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::{PlaybackRate, Provider, ResolvedSource, SubtitleTrack};

/// Platform media element (an `HTMLMediaElement` or an equivalent decoder)
///
/// Implementations emit [`AdapterEvent`]s on the sink passed to
/// [`MediaElement::attach`] and must stop emitting after
/// [`MediaElement::detach`].
pub trait MediaElement: Send {
    fn attach(&mut self, events: EventSink);

    fn set_source(&mut self, url: &str);

    fn add_text_track(&mut self, track: &SubtitleTrack);

    /// Show the track for `language`, or hide all tracks for `None`
    fn show_text_track(&mut self, language: Option<&str>);

    /// Begin fetching media; reports `Loaded` or `Error`
    fn load(&mut self);

    fn play(&mut self) -> PlatformOp;

    fn pause(&mut self);

    fn set_current_time(&mut self, time: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    fn set_playback_rate(&mut self, rate: f64);

    fn request_fullscreen(&mut self) -> PlatformOp;

    fn exit_fullscreen(&mut self) -> PlatformOp;

    fn detach(&mut self);
}

pub struct NativeAdapter {
    element: Box<dyn MediaElement>,
    subtitles: Vec<SubtitleTrack>,
    detached: bool,
}

impl NativeAdapter {
    /// Wire the element to the event sink and point it at the media URL
    pub fn new(
        mut element: Box<dyn MediaElement>,
        source: &ResolvedSource,
        subtitles: Vec<SubtitleTrack>,
        events: EventSink,
    ) -> Self {
        element.attach(events);
        element.set_source(&source.embed_url);
        for track in &subtitles {
            element.add_text_track(track);
        }
        debug!(
            "Native adapter attached to {} with {} subtitle track(s)",
            source.embed_url,
            subtitles.len()
        );

        Self {
            element,
            subtitles,
            detached: false,
        }
    }
}

impl SourceAdapter for NativeAdapter {
    fn provider(&self) -> Provider {
        Provider::Native
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::FULL
    }

    fn load(&mut self) {
        if !self.detached {
            self.element.load();
        }
    }

    fn play(&mut self) -> PlatformOp {
        if self.detached {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        self.element.play()
    }

    fn pause(&mut self) {
        if !self.detached {
            self.element.pause();
        }
    }

    fn seek(&mut self, time: f64) {
        if !self.detached {
            self.element.set_current_time(time);
        }
    }

    fn set_volume(&mut self, volume: f64) {
        if !self.detached {
            self.element.set_volume(volume);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        if !self.detached {
            self.element.set_muted(muted);
        }
    }

    fn set_playback_rate(&mut self, rate: PlaybackRate) {
        if !self.detached {
            self.element.set_playback_rate(rate.value());
        }
    }

    fn subtitle_languages(&self) -> Vec<String> {
        self.subtitles
            .iter()
            .map(|track| track.language_code.clone())
            .collect()
    }

    fn set_subtitle(&mut self, language: Option<&str>) -> PlatformResult<()> {
        if self.detached {
            return Err(PlatformError::Detached);
        }
        if let Some(code) = language
            && !self.subtitles.iter().any(|t| t.language_code == code)
        {
            warn!("No subtitle track loaded for '{}'", code);
            return Err(PlatformError::unsupported(format!("subtitle track {code}")));
        }
        self.element.show_text_track(language);
        Ok(())
    }

    fn request_fullscreen(&mut self) -> PlatformOp {
        if self.detached {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        self.element.request_fullscreen()
    }

    fn exit_fullscreen(&mut self) -> PlatformOp {
        if self.detached {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        self.element.exit_fullscreen()
    }

    fn detach(&mut self) {
        if !self.detached {
            self.detached = true;
            self.element.detach();
        }
    }
}

impl Drop for NativeAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::SimulatedMediaElement;
    use crate::adapters::subscription;
    use crate::sources::SourceResolver;

    fn adapter_with(
        tracks: Vec<SubtitleTrack>,
    ) -> (
        NativeAdapter,
        crate::adapters::simulated::SimulatedElementHandle,
        crate::adapters::EventSubscription,
    ) {
        let (element, handle) = SimulatedMediaElement::new(120.0);
        let (sink, subscription) = subscription();
        let source = SourceResolver::resolve("https://cdn.example.com/intro.mp4");
        let adapter = NativeAdapter::new(Box::new(element), &source, tracks, sink);
        (adapter, handle, subscription)
    }

    fn english() -> SubtitleTrack {
        SubtitleTrack {
            language_code: "en".to_string(),
            subtitle_url: "https://cdn.example.com/intro.en.vtt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_reports_duration() {
        let (mut adapter, handle, mut events) = adapter_with(Vec::new());
        adapter.load();

        assert_eq!(
            events.try_recv(),
            Some(AdapterEvent::Loaded { duration: 120.0 })
        );
        assert_eq!(handle.snapshot().source.as_deref(), Some("https://cdn.example.com/intro.mp4"));
    }

    #[tokio::test]
    async fn test_commands_reach_the_element() {
        let (mut adapter, handle, _events) = adapter_with(Vec::new());
        adapter.load();
        assert_eq!(adapter.play().await, Ok(()));
        adapter.set_volume(0.4);
        adapter.set_muted(true);
        adapter.set_playback_rate(PlaybackRate::try_from(1.5).unwrap());
        adapter.seek(30.0);

        let snapshot = handle.snapshot();
        assert!(!snapshot.paused);
        assert_eq!(snapshot.volume, 0.4);
        assert!(snapshot.muted);
        assert_eq!(snapshot.rate, 1.5);
        assert_eq!(snapshot.current_time, 30.0);
    }

    #[tokio::test]
    async fn test_subtitle_selection() {
        let (mut adapter, handle, _events) = adapter_with(vec![english()]);

        assert_eq!(adapter.subtitle_languages(), vec!["en".to_string()]);
        assert!(adapter.set_subtitle(Some("en")).is_ok());
        assert_eq!(handle.snapshot().showing_track.as_deref(), Some("en"));
        assert!(adapter.set_subtitle(Some("fr")).is_err());
        assert!(adapter.set_subtitle(None).is_ok());
        assert_eq!(handle.snapshot().showing_track, None);
    }

    #[tokio::test]
    async fn test_detached_adapter_rejects_operations() {
        let (mut adapter, handle, _events) = adapter_with(Vec::new());
        adapter.detach();

        assert!(handle.snapshot().detached);
        assert_eq!(adapter.play().await, Err(PlatformError::Detached));
        assert_eq!(
            adapter.request_fullscreen().await,
            Err(PlatformError::Detached)
        );
    }
}
