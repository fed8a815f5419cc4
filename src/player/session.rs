//! Canonical playback state and its reducer
//!
//! [`PlaybackSession`] is the single writer of [`PlaybackState`]. Control
//! commands update it optimistically through the `request_*` methods and
//! backend events are folded in through [`PlaybackSession::apply`]; when the
//! two disagree the backend event arrives later and wins. Every write keeps
//! `current_time` inside `[0, duration]` and `volume` inside `[0, 1]`, and
//! every phase change goes through [`PlaybackPhase::can_transition_to`].
//!
//! Observers read snapshots through a `watch` channel.

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::adapters::AdapterEvent;
use crate::models::{PlaybackPhase, PlaybackRate, PlaybackState};

/// Notable transitions produced by [`PlaybackSession::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded { duration: f64 },
    /// The media clock moved; `playing` tells whether it moved by playback
    TimeChanged { time: f64, duration: f64, playing: bool },
    /// An in-flight seek finished and no other seek is pending
    SeekSettled { time: f64 },
    Ended { duration: f64 },
    Failed { message: String },
}

pub struct PlaybackSession {
    state: PlaybackState,
    /// Phase to restore if an optimistic play is refused
    phase_before_play: Option<PlaybackPhase>,
    tx: watch::Sender<PlaybackState>,
}

impl PlaybackSession {
    pub fn new(initial: PlaybackState) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            state: initial,
            phase_before_play: None,
            tx,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.state.clone());
    }

    fn transition(&mut self, next: PlaybackPhase) -> bool {
        let current = self.state.phase;
        if current == next {
            return true;
        }
        if !current.can_transition_to(next) {
            debug!("Ignoring phase change {} -> {}", current, next);
            return false;
        }
        trace!("Playback phase {} -> {}", current, next);
        self.state.phase = next;
        true
    }

    fn set_time(&mut self, time: f64) {
        self.state.current_time = self.state.clamp_time(time);
    }

    /// Start (or restart) loading media
    pub fn begin_load(&mut self) {
        if self.transition(PlaybackPhase::Loading) {
            self.state.is_loading = true;
            self.state.is_playing = false;
            self.state.is_seeking = false;
            self.state.error = None;
            self.phase_before_play = None;
        }
        self.publish();
    }

    /// Optimistic play. Returns `false` when there is no media to play yet.
    pub fn request_play(&mut self) -> bool {
        if !self.state.phase.has_media() {
            return false;
        }
        let previous = self.state.phase;
        if self.transition(PlaybackPhase::Playing) {
            self.phase_before_play = Some(previous);
            self.state.is_playing = true;
        }
        self.publish();
        true
    }

    /// Undo an optimistic play the platform refused
    pub fn play_rejected(&mut self) {
        if let Some(previous) = self.phase_before_play.take()
            && self.state.phase == PlaybackPhase::Playing
        {
            self.state.phase = previous;
            self.state.is_playing = false;
            self.publish();
        }
    }

    pub fn play_confirmed(&mut self) {
        self.phase_before_play = None;
    }

    pub fn request_pause(&mut self) {
        self.phase_before_play = None;
        self.state.is_playing = false;
        if self.state.phase == PlaybackPhase::Playing {
            self.transition(PlaybackPhase::Paused);
        }
        self.publish();
    }

    /// Optimistic seek. Returns the clamped target. Leaves `Ended` for
    /// `Paused`; `observed` marks the seek in flight until the backend
    /// reports completion.
    pub fn request_seek(&mut self, target: f64, observed: bool) -> f64 {
        let target = self.state.clamp_time(target);
        self.state.current_time = target;
        if self.state.phase == PlaybackPhase::Ended && target < self.state.duration {
            self.transition(PlaybackPhase::Paused);
        }
        if observed && self.state.phase.has_media() {
            self.state.is_seeking = true;
        }
        self.publish();
        target
    }

    /// Returns the clamped volume
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.state.volume = clamp_volume(volume);
        self.publish();
        self.state.volume
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state.is_muted = muted;
        self.publish();
    }

    pub fn set_rate(&mut self, rate: PlaybackRate) {
        self.state.playback_rate = rate;
        self.publish();
    }

    pub fn set_quality(&mut self, label: &str) {
        self.state.quality = label.to_string();
        self.publish();
    }

    pub fn set_fullscreen(&mut self, active: bool) {
        self.state.is_fullscreen = active;
        self.publish();
    }

    pub fn set_subtitle(&mut self, language: Option<&str>) {
        self.state.subtitle_language = language.map(str::to_string);
        self.publish();
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        if self.state.controls_visible != visible {
            self.state.controls_visible = visible;
            self.publish();
        }
    }

    /// Fold a backend event into the state
    pub fn apply(&mut self, event: AdapterEvent) -> Option<SessionEvent> {
        let outcome = match event {
            AdapterEvent::Loaded { duration } => {
                self.state.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
                self.state.is_loading = false;
                self.set_time(self.state.current_time);
                if self.state.phase == PlaybackPhase::Loading {
                    self.transition(PlaybackPhase::Ready);
                }
                Some(SessionEvent::Loaded {
                    duration: self.state.duration,
                })
            }
            AdapterEvent::TimeUpdate { time } => {
                if !time.is_finite() {
                    warn!("Ignoring non-finite time update");
                    None
                } else {
                    self.set_time(time);
                    Some(SessionEvent::TimeChanged {
                        time: self.state.current_time,
                        duration: self.state.duration,
                        playing: self.state.phase == PlaybackPhase::Playing && !self.state.is_seeking,
                    })
                }
            }
            AdapterEvent::BufferUpdate { fraction } => {
                self.state.buffered = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
                None
            }
            AdapterEvent::Playing => {
                self.phase_before_play = None;
                if self.transition(PlaybackPhase::Playing) {
                    self.state.is_playing = true;
                    self.state.is_loading = false;
                }
                None
            }
            AdapterEvent::Paused => {
                self.state.is_playing = false;
                if self.state.phase == PlaybackPhase::Playing {
                    self.transition(PlaybackPhase::Paused);
                }
                None
            }
            AdapterEvent::Ended => {
                if self.transition(PlaybackPhase::Ended) {
                    self.state.is_playing = false;
                    self.phase_before_play = None;
                    if self.state.duration_known() {
                        self.state.current_time = self.state.duration;
                    }
                    Some(SessionEvent::Ended {
                        duration: self.state.duration,
                    })
                } else {
                    None
                }
            }
            AdapterEvent::VolumeChanged { volume, muted } => {
                self.state.volume = clamp_volume(volume);
                self.state.is_muted = muted;
                None
            }
            AdapterEvent::Seeking { time } => {
                if self.state.phase.has_media() {
                    self.state.is_seeking = true;
                    self.set_time(time);
                }
                None
            }
            AdapterEvent::Seeked { time } => {
                self.state.is_seeking = false;
                self.set_time(time);
                Some(SessionEvent::SeekSettled {
                    time: self.state.current_time,
                })
            }
            AdapterEvent::RateChanged { rate } => {
                match PlaybackRate::try_from(rate) {
                    Ok(rate) => self.state.playback_rate = rate,
                    Err(_) => warn!("Backend reported unsupported rate {}", rate),
                }
                None
            }
            AdapterEvent::FullscreenChanged { active } => {
                self.state.is_fullscreen = active;
                None
            }
            AdapterEvent::Error { message } => {
                self.transition(PlaybackPhase::Error);
                self.state.is_playing = false;
                self.state.is_loading = false;
                self.state.is_seeking = false;
                self.phase_before_play = None;
                self.state.error = Some(message.clone());
                Some(SessionEvent::Failed { message })
            }
        };

        self.publish();
        outcome
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
