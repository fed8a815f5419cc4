//! Playback backend adapters
//!
//! A [`SourceAdapter`] hides whether the lesson plays in a media element the
//! player owns ([`NativeAdapter`]) or in a third-party iframe
//! ([`EmbeddedAdapter`]). The variant is chosen once, in [`build_adapter`],
//! from the resolved source; callers never branch on it afterwards.
//!
//! Backends report what happened through a single [`EventSink`] handed to
//! them at construction. The matching [`EventSubscription`] is owned by the
//! controller and closing it tears the whole subscription down at once, so
//! events emitted after teardown are discarded instead of being applied.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::config::EmbedConfig;
use crate::errors::{PlatformError, PlatformResult};
use crate::models::{PlaybackRate, Provider, ResolvedSource, SubtitleTrack};

pub mod embedded;
pub mod native;
pub mod simulated;

pub use embedded::{EmbedCommand, EmbedHost, EmbedParams, EmbeddedAdapter};
pub use native::{MediaElement, NativeAdapter};

/// Events a backend reports, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// Metadata is available; `duration` is `0.0` when the backend cannot tell
    Loaded { duration: f64 },
    TimeUpdate { time: f64 },
    BufferUpdate { fraction: f64 },
    Playing,
    Paused,
    Ended,
    VolumeChanged { volume: f64, muted: bool },
    Seeking { time: f64 },
    Seeked { time: f64 },
    RateChanged { rate: f64 },
    FullscreenChanged { active: bool },
    /// Unrecoverable media failure (network, decode)
    Error { message: String },
}

/// Sending half of the subscription table, owned by the backend
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AdapterEvent>,
    open: Arc<AtomicBool>,
}

impl EventSink {
    pub fn emit(&self, event: AdapterEvent) {
        if !self.open.load(Ordering::Acquire) {
            trace!("Discarding {:?} emitted after teardown", event);
            return;
        }
        let _ = self.tx.send(event);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }
}

/// Receiving half of the subscription table, owned by the controller
#[derive(Debug)]
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<AdapterEvent>,
    open: Arc<AtomicBool>,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Option<AdapterEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AdapterEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting events; anything already queued is dropped
    pub fn close(&mut self) {
        self.open.store(false, Ordering::Release);
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Create the subscription table shared by one backend and its controller
pub fn subscription() -> (EventSink, EventSubscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    let open = Arc::new(AtomicBool::new(true));
    (
        EventSink {
            tx,
            open: open.clone(),
        },
        EventSubscription { rx, open },
    )
}

/// Pending result of an asynchronous platform operation (`play()`,
/// fullscreen requests). Dropping the resolver without answering reads as
/// [`PlatformError::Detached`].
#[derive(Debug)]
pub struct PlatformOp {
    rx: oneshot::Receiver<PlatformResult<()>>,
}

/// Completion side of a [`PlatformOp`]
#[derive(Debug)]
pub struct PlatformOpResolver {
    tx: oneshot::Sender<PlatformResult<()>>,
}

impl PlatformOp {
    pub fn pending() -> (PlatformOpResolver, PlatformOp) {
        let (tx, rx) = oneshot::channel();
        (PlatformOpResolver { tx }, PlatformOp { rx })
    }

    /// An operation that has already completed
    pub fn ready(result: PlatformResult<()>) -> Self {
        let (resolver, op) = Self::pending();
        resolver.resolve(result);
        op
    }
}

impl PlatformOpResolver {
    pub fn resolve(self, result: PlatformResult<()>) {
        let _ = self.tx.send(result);
    }
}

impl Future for PlatformOp {
    type Output = PlatformResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(PlatformError::Detached)))
    }
}

/// What a backend can guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fidelity {
    /// Commands are known to reach the backend
    pub commands_guaranteed: bool,
    /// Time, play/pause, seek and volume events are reported
    pub observes_playback: bool,
}

impl Fidelity {
    pub const FULL: Fidelity = Fidelity {
        commands_guaranteed: true,
        observes_playback: true,
    };

    /// Only construction-time parameters and coarse lifecycle are reliable
    pub const LIFECYCLE_ONLY: Fidelity = Fidelity {
        commands_guaranteed: false,
        observes_playback: false,
    };
}

/// Control surface every playback backend offers
pub trait SourceAdapter: Send {
    fn provider(&self) -> Provider;

    fn fidelity(&self) -> Fidelity;

    /// Start (or restart after an error) loading the media
    fn load(&mut self);

    fn play(&mut self) -> PlatformOp;

    fn pause(&mut self);

    fn seek(&mut self, time: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    fn set_playback_rate(&mut self, rate: PlaybackRate);

    /// Advisory quality label; backends may ignore it
    fn set_quality(&mut self, _label: &str) {}

    fn subtitle_languages(&self) -> Vec<String> {
        Vec::new()
    }

    fn set_subtitle(&mut self, _language: Option<&str>) -> PlatformResult<()> {
        Err(PlatformError::unsupported("subtitles"))
    }

    fn request_fullscreen(&mut self) -> PlatformOp;

    fn exit_fullscreen(&mut self) -> PlatformOp;

    /// The adapter's own estimate of the media time, for backends whose
    /// time updates cannot be observed
    fn position_hint(&self) -> Option<f64> {
        None
    }

    /// Release the backend; no events are emitted afterwards
    fn detach(&mut self);
}

/// Factory for the platform objects a backend needs
pub trait PlatformHost {
    fn create_media_element(&mut self) -> Box<dyn MediaElement>;

    fn create_embed_host(&mut self) -> Box<dyn EmbedHost>;
}

/// Everything needed to construct an adapter for one lesson
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub subtitles: Vec<SubtitleTrack>,
    pub autoplay: bool,
    /// Position the embedded player should start at
    pub start_at: Option<f64>,
    pub embed: EmbedConfig,
}

/// Select and construct the adapter for a resolved source
pub fn build_adapter(
    source: &ResolvedSource,
    host: &mut dyn PlatformHost,
    options: AdapterOptions,
    events: EventSink,
) -> Box<dyn SourceAdapter> {
    match source.provider {
        Provider::Native => Box::new(NativeAdapter::new(
            host.create_media_element(),
            source,
            options.subtitles,
            events,
        )),
        Provider::Embedded => Box::new(EmbeddedAdapter::new(
            host.create_embed_host(),
            source,
            EmbedParams {
                autoplay: options.autoplay,
                origin: options.embed.origin,
                show_controls: options.embed.show_provider_controls,
                start_at: options.start_at,
            },
            events,
        )),
    }
}
