//! In-process playback backends
//!
//! [`SimulatedMediaElement`] behaves like a browser media element driven by
//! a virtual clock: `play()` returns a pending operation, `pause()` interrupts
//! it, seeks report `seeking`/`seeked`, and [`SimulatedElementHandle::advance`]
//! produces time updates until the media ends. [`SimulatedEmbedHost`] stands
//! in for an iframe. The CLI drives lessons through these with
//! [`SimulatedPlatform::watch_lesson`], and the tests use the handles to
//! script platform behavior.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};
use url::Url;

use super::{
    AdapterEvent, EmbedCommand, EmbedHost, EventSink, MediaElement, PlatformHost, PlatformOp,
    PlatformOpResolver,
};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::{PlaybackPhase, SubtitleTrack};
use crate::player::PlayerController;

/// How the simulated element answers `play()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayPolicy {
    /// Start immediately
    Resolve,
    /// Leave the operation pending until resolved or interrupted
    Hold,
    /// Refuse, as an autoplay policy would
    Reject(String),
}

/// How the simulated element completes seeks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Immediate,
    /// Seeks stay in flight until [`SimulatedElementHandle::complete_seek`]
    Deferred,
}

/// Observable element state
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub source: Option<String>,
    pub loaded: bool,
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub fullscreen: bool,
    pub showing_track: Option<String>,
    pub text_tracks: Vec<String>,
    pub detached: bool,
}

#[derive(Debug)]
struct ElementState {
    snapshot: ElementSnapshot,
    events: Option<EventSink>,
    play_policy: PlayPolicy,
    seek_mode: SeekMode,
    fullscreen_allowed: bool,
    load_error: Option<String>,
    pending_play: Option<PlatformOpResolver>,
    pending_seek: Option<f64>,
}

impl ElementState {
    fn emit(&self, event: AdapterEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn finish_seek(&mut self, time: f64) {
        self.snapshot.current_time = time;
        self.emit(AdapterEvent::Seeked { time });
    }
}

fn lock(state: &Mutex<ElementState>) -> MutexGuard<'_, ElementState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Media element with a virtual clock
#[derive(Debug)]
pub struct SimulatedMediaElement {
    state: Arc<Mutex<ElementState>>,
}

/// Scripting handle shared with a [`SimulatedMediaElement`]
#[derive(Debug, Clone)]
pub struct SimulatedElementHandle {
    state: Arc<Mutex<ElementState>>,
}

impl SimulatedMediaElement {
    pub fn new(duration: f64) -> (Self, SimulatedElementHandle) {
        let state = Arc::new(Mutex::new(ElementState {
            snapshot: ElementSnapshot {
                source: None,
                loaded: false,
                current_time: 0.0,
                duration,
                paused: true,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                fullscreen: false,
                showing_track: None,
                text_tracks: Vec::new(),
                detached: false,
            },
            events: None,
            play_policy: PlayPolicy::Resolve,
            seek_mode: SeekMode::Immediate,
            fullscreen_allowed: true,
            load_error: None,
            pending_play: None,
            pending_seek: None,
        }));
        (
            Self {
                state: state.clone(),
            },
            SimulatedElementHandle { state },
        )
    }
}

impl MediaElement for SimulatedMediaElement {
    fn attach(&mut self, events: EventSink) {
        lock(&self.state).events = Some(events);
    }

    fn set_source(&mut self, url: &str) {
        lock(&self.state).snapshot.source = Some(url.to_string());
    }

    fn add_text_track(&mut self, track: &SubtitleTrack) {
        lock(&self.state)
            .snapshot
            .text_tracks
            .push(track.language_code.clone());
    }

    fn show_text_track(&mut self, language: Option<&str>) {
        lock(&self.state).snapshot.showing_track = language.map(str::to_string);
    }

    fn load(&mut self) {
        let mut state = lock(&self.state);
        match state.load_error.take() {
            Some(message) => {
                state.snapshot.loaded = false;
                state.emit(AdapterEvent::Error { message });
            }
            None => {
                state.snapshot.loaded = true;
                let duration = state.snapshot.duration;
                state.emit(AdapterEvent::Loaded { duration });
            }
        }
    }

    fn play(&mut self) -> PlatformOp {
        let mut state = lock(&self.state);
        if state.snapshot.detached {
            return PlatformOp::ready(Err(PlatformError::Detached));
        }
        match state.play_policy.clone() {
            PlayPolicy::Resolve => {
                state.snapshot.paused = false;
                state.emit(AdapterEvent::Playing);
                PlatformOp::ready(Ok(()))
            }
            PlayPolicy::Hold => {
                state.snapshot.paused = false;
                let (resolver, op) = PlatformOp::pending();
                if let Some(previous) = state.pending_play.replace(resolver) {
                    previous.resolve(Err(PlatformError::Interrupted));
                }
                op
            }
            PlayPolicy::Reject(reason) => PlatformOp::ready(Err(PlatformError::not_allowed(reason))),
        }
    }

    fn pause(&mut self) {
        let mut state = lock(&self.state);
        if let Some(pending) = state.pending_play.take() {
            pending.resolve(Err(PlatformError::Interrupted));
        }
        if !state.snapshot.paused {
            state.snapshot.paused = true;
            state.emit(AdapterEvent::Paused);
        }
    }

    fn set_current_time(&mut self, time: f64) {
        let mut state = lock(&self.state);
        let time = time.clamp(0.0, state.snapshot.duration.max(0.0));
        state.emit(AdapterEvent::Seeking { time });
        match state.seek_mode {
            SeekMode::Immediate => state.finish_seek(time),
            SeekMode::Deferred => state.pending_seek = Some(time),
        }
    }

    fn set_volume(&mut self, volume: f64) {
        let mut state = lock(&self.state);
        state.snapshot.volume = volume;
        let muted = state.snapshot.muted;
        state.emit(AdapterEvent::VolumeChanged { volume, muted });
    }

    fn set_muted(&mut self, muted: bool) {
        let mut state = lock(&self.state);
        state.snapshot.muted = muted;
        let volume = state.snapshot.volume;
        state.emit(AdapterEvent::VolumeChanged { volume, muted });
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let mut state = lock(&self.state);
        state.snapshot.rate = rate;
        state.emit(AdapterEvent::RateChanged { rate });
    }

    fn request_fullscreen(&mut self) -> PlatformOp {
        let mut state = lock(&self.state);
        if !state.fullscreen_allowed {
            return PlatformOp::ready(Err(PlatformError::not_allowed("fullscreen denied")));
        }
        state.snapshot.fullscreen = true;
        state.emit(AdapterEvent::FullscreenChanged { active: true });
        PlatformOp::ready(Ok(()))
    }

    fn exit_fullscreen(&mut self) -> PlatformOp {
        let mut state = lock(&self.state);
        state.snapshot.fullscreen = false;
        state.emit(AdapterEvent::FullscreenChanged { active: false });
        PlatformOp::ready(Ok(()))
    }

    fn detach(&mut self) {
        let mut state = lock(&self.state);
        state.snapshot.detached = true;
        state.snapshot.paused = true;
        state.events = None;
        state.pending_play = None;
        state.pending_seek = None;
    }
}

impl SimulatedElementHandle {
    pub fn snapshot(&self) -> ElementSnapshot {
        lock(&self.state).snapshot.clone()
    }

    pub fn set_play_policy(&self, policy: PlayPolicy) {
        lock(&self.state).play_policy = policy;
    }

    pub fn set_seek_mode(&self, mode: SeekMode) {
        lock(&self.state).seek_mode = mode;
    }

    pub fn set_fullscreen_allowed(&self, allowed: bool) {
        lock(&self.state).fullscreen_allowed = allowed;
    }

    /// Make the next `load()` report `message` as a media error
    pub fn fail_next_load(&self, message: impl Into<String>) {
        lock(&self.state).load_error = Some(message.into());
    }

    /// Settle a `play()` left pending by [`PlayPolicy::Hold`]
    pub fn resolve_pending_play(&self, result: PlatformResult<()>) -> bool {
        let mut state = lock(&self.state);
        let Some(pending) = state.pending_play.take() else {
            return false;
        };
        match &result {
            Ok(()) => state.emit(AdapterEvent::Playing),
            Err(_) => state.snapshot.paused = true,
        }
        pending.resolve(result);
        true
    }

    /// Finish an in-flight seek started under [`SeekMode::Deferred`]
    pub fn complete_seek(&self) -> bool {
        let mut state = lock(&self.state);
        match state.pending_seek.take() {
            Some(time) => {
                state.finish_seek(time);
                true
            }
            None => false,
        }
    }

    /// Emit an arbitrary event, as a platform quirk would
    pub fn emit(&self, event: AdapterEvent) {
        lock(&self.state).emit(event);
    }

    /// Run the virtual clock for `seconds` of wall time in `step` increments,
    /// emitting a time update per step while playing. Returns the number of
    /// updates emitted.
    pub fn advance(&self, seconds: f64, step: f64) -> usize {
        let mut state = lock(&self.state);
        let mut remaining = seconds;
        let mut emitted = 0;
        let step = if step > 0.0 { step } else { 0.25 };

        while remaining > 1e-9
            && !state.snapshot.paused
            && !state.snapshot.detached
            && state.pending_play.is_none()
            && state.pending_seek.is_none()
        {
            let dt = step.min(remaining);
            remaining -= dt;
            let duration = state.snapshot.duration;
            let time = (state.snapshot.current_time + dt * state.snapshot.rate).min(duration);
            state.snapshot.current_time = time;
            state.emit(AdapterEvent::TimeUpdate { time });
            emitted += 1;

            if time >= duration {
                trace!("Simulated media reached the end at {}", time);
                state.snapshot.paused = true;
                state.emit(AdapterEvent::Paused);
                state.emit(AdapterEvent::Ended);
                break;
            }
        }
        emitted
    }
}

#[derive(Debug)]
struct EmbedState {
    src: Option<Url>,
    mounted: bool,
    delivering: bool,
    delivered: Vec<EmbedCommand>,
    mount_error: Option<String>,
    unmounts: usize,
    fullscreen_allowed: bool,
    events: Option<EventSink>,
}

fn lock_embed(state: &Mutex<EmbedState>) -> MutexGuard<'_, EmbedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Iframe host that records what is posted to it
#[derive(Debug)]
pub struct SimulatedEmbedHost {
    state: Arc<Mutex<EmbedState>>,
}

#[derive(Debug, Clone)]
pub struct SimulatedEmbedHandle {
    state: Arc<Mutex<EmbedState>>,
}

impl SimulatedEmbedHost {
    pub fn new() -> (Self, SimulatedEmbedHandle) {
        let state = Arc::new(Mutex::new(EmbedState {
            src: None,
            mounted: false,
            delivering: true,
            delivered: Vec::new(),
            mount_error: None,
            unmounts: 0,
            fullscreen_allowed: true,
            events: None,
        }));
        (
            Self {
                state: state.clone(),
            },
            SimulatedEmbedHandle { state },
        )
    }
}

impl EmbedHost for SimulatedEmbedHost {
    fn mount(&mut self, src: &Url, events: EventSink) -> PlatformResult<()> {
        let mut state = lock_embed(&self.state);
        if let Some(reason) = state.mount_error.take() {
            return Err(PlatformError::not_allowed(reason));
        }
        state.src = Some(src.clone());
        state.mounted = true;
        state.events = Some(events);
        Ok(())
    }

    fn post(&mut self, command: EmbedCommand) -> bool {
        let mut state = lock_embed(&self.state);
        if !state.mounted || !state.delivering {
            return false;
        }
        state.delivered.push(command);
        true
    }

    fn request_fullscreen(&mut self) -> PlatformOp {
        let state = lock_embed(&self.state);
        if state.fullscreen_allowed {
            PlatformOp::ready(Ok(()))
        } else {
            PlatformOp::ready(Err(PlatformError::not_allowed("fullscreen denied")))
        }
    }

    fn exit_fullscreen(&mut self) -> PlatformOp {
        PlatformOp::ready(Ok(()))
    }

    fn unmount(&mut self) {
        let mut state = lock_embed(&self.state);
        state.mounted = false;
        state.events = None;
        state.unmounts += 1;
    }
}

impl SimulatedEmbedHandle {
    pub fn is_mounted(&self) -> bool {
        lock_embed(&self.state).mounted
    }

    pub fn src(&self) -> Option<Url> {
        lock_embed(&self.state).src.clone()
    }

    pub fn fail_mount(&self, reason: impl Into<String>) {
        lock_embed(&self.state).mount_error = Some(reason.into());
    }

    /// Whether posted commands reach the frame
    pub fn set_delivering(&self, delivering: bool) {
        lock_embed(&self.state).delivering = delivering;
    }

    pub fn set_fullscreen_allowed(&self, allowed: bool) {
        lock_embed(&self.state).fullscreen_allowed = allowed;
    }

    pub fn delivered(&self) -> Vec<EmbedCommand> {
        lock_embed(&self.state).delivered.clone()
    }

    pub fn unmount_count(&self) -> usize {
        lock_embed(&self.state).unmounts
    }

    /// Emit an event from the frame, for bridges that report more than readiness
    pub fn emit(&self, event: AdapterEvent) {
        if let Some(events) = &lock_embed(&self.state).events {
            events.emit(event);
        }
    }
}

/// [`PlatformHost`] handing out simulated backends bound to shared handles
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    element: SimulatedElementHandle,
    embed: SimulatedEmbedHandle,
}

impl SimulatedPlatform {
    pub fn new(duration: f64) -> Self {
        let (_, element) = SimulatedMediaElement::new(duration);
        let (_, embed) = SimulatedEmbedHost::new();
        Self { element, embed }
    }

    pub fn element(&self) -> &SimulatedElementHandle {
        &self.element
    }

    pub fn embed(&self) -> &SimulatedEmbedHandle {
        &self.embed
    }

    /// Play up to `seconds` of the lesson on the simulated clock, one-second
    /// chunks at a time, settling the controller after each. Stops early at
    /// the end of the media and returns the seconds simulated. Embedded
    /// frames report no time updates, so they are not driven at all.
    pub async fn watch_lesson(
        &self,
        controller: &mut PlayerController,
        seconds: f64,
        step: f64,
    ) -> f64 {
        if controller.source().is_embedded() {
            warn!(
                "Lesson {} is embedded and reports no playback time; skipping simulated watch",
                controller.context().lesson_id
            );
            return 0.0;
        }

        let mut watched = 0.0;
        while watched < seconds && controller.state().phase != PlaybackPhase::Ended {
            let chunk = (seconds - watched).min(1.0);
            self.element.advance(chunk, step);
            controller.settle().await;
            watched += chunk;
        }
        watched
    }
}

impl PlatformHost for SimulatedPlatform {
    fn create_media_element(&mut self) -> Box<dyn MediaElement> {
        Box::new(SimulatedMediaElement {
            state: self.element.state.clone(),
        })
    }

    fn create_embed_host(&mut self) -> Box<dyn EmbedHost> {
        Box::new(SimulatedEmbedHost {
            state: self.embed.state.clone(),
        })
    }
}
