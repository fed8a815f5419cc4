//! The control surface: user-level commands on a [`PlayerController`]
//!
//! Each command validates its input before touching anything, updates the
//! session optimistically, forwards to the adapter and records the matching
//! activity event. Play, pause and toggle issued while a seek is in flight
//! are queued and replayed once the backend reports the seek finished.

use tracing::{debug, info, warn};

use super::controller::PlayerController;
use crate::errors::{PlayerError, PlayerResult};
use crate::models::{Activity, Bookmark, PlaybackPhase, PlaybackRate};

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    SetVolume(f64),
    ToggleMute,
    SetPlaybackRate(f64),
    SetQuality(String),
    ToggleFullscreen,
    SetSubtitles(Option<String>),
    ShowControls,
}

impl ControlCommand {
    /// Transport commands wait for an in-flight seek
    fn waits_for_seek(&self) -> bool {
        matches!(self, Self::Play | Self::Pause | Self::TogglePlay)
    }

    /// Reject malformed input before any state is touched
    pub fn validate(&self) -> PlayerResult<()> {
        match self {
            Self::Seek(target) if !target.is_finite() => {
                Err(PlayerError::InvalidSeek { target: *target })
            }
            Self::SetVolume(volume) if !volume.is_finite() => {
                Err(PlayerError::InvalidVolume { volume: *volume })
            }
            Self::SetPlaybackRate(rate) => PlaybackRate::try_from(*rate).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl PlayerController {
    /// Execute one control command
    pub fn dispatch(&mut self, command: ControlCommand) -> PlayerResult<()> {
        self.ensure_open()?;
        command.validate()?;

        if command.waits_for_seek() && self.session.state().is_seeking {
            debug!("Queueing {:?} behind in-flight seek", command);
            self.deferred.push_back(command);
            return Ok(());
        }

        match command {
            ControlCommand::Play => self.start_playback(),
            ControlCommand::Pause => self.pause_playback(),
            ControlCommand::TogglePlay => {
                if self.session.state().is_playing {
                    self.pause_playback()
                } else {
                    self.start_playback()
                }
            }
            ControlCommand::Seek(target) => self.seek_to(target),
            ControlCommand::SetVolume(volume) => self.apply_volume(volume),
            ControlCommand::ToggleMute => self.flip_mute(),
            ControlCommand::SetPlaybackRate(rate) => self.change_rate(rate)?,
            ControlCommand::SetQuality(label) => self.change_quality(&label),
            ControlCommand::ToggleFullscreen => self.flip_fullscreen(),
            ControlCommand::SetSubtitles(language) => self.select_subtitles(language)?,
            ControlCommand::ShowControls => self.show_controls(),
        }
        Ok(())
    }

    /// Start or resume playback; a no-op while already playing
    pub fn play(&mut self) -> PlayerResult<()> {
        self.dispatch(ControlCommand::Play)
    }

    pub fn pause(&mut self) -> PlayerResult<()> {
        self.dispatch(ControlCommand::Pause)
    }

    pub fn toggle_play(&mut self) -> PlayerResult<()> {
        self.dispatch(ControlCommand::TogglePlay)
    }

    /// Jump to `time` seconds, clamped into the media
    pub fn seek(&mut self, time: f64) -> PlayerResult<()> {
        self.dispatch(ControlCommand::Seek(time))
    }

    /// Set the volume, clamped to `[0, 1]`; mute is left alone
    pub fn set_volume(&mut self, volume: f64) -> PlayerResult<()> {
        self.dispatch(ControlCommand::SetVolume(volume))
    }

    pub fn toggle_mute(&mut self) -> PlayerResult<()> {
        self.dispatch(ControlCommand::ToggleMute)
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> PlayerResult<()> {
        self.dispatch(ControlCommand::SetPlaybackRate(rate))
    }

    pub fn set_quality(&mut self, label: impl Into<String>) -> PlayerResult<()> {
        self.dispatch(ControlCommand::SetQuality(label.into()))
    }

    pub fn toggle_fullscreen(&mut self) -> PlayerResult<()> {
        self.dispatch(ControlCommand::ToggleFullscreen)
    }

    /// Show the subtitle track for `language`, or hide subtitles for `None`
    pub fn set_subtitles(&mut self, language: Option<&str>) -> PlayerResult<()> {
        self.dispatch(ControlCommand::SetSubtitles(language.map(str::to_string)))
    }

    pub fn show_controls(&mut self) {
        self.session.set_controls_visible(true);
        if self.session.state().is_playing {
            self.controls.arm();
        } else {
            self.controls.cancel();
        }
    }

    /// Bookmark the current position
    pub async fn bookmark(&mut self) -> PlayerResult<Bookmark> {
        self.ensure_open()?;
        let state = self.session.state();
        let position = state.clamp_time(self.adapter.position_hint().unwrap_or(state.current_time));
        let bookmark = Bookmark::new(self.context.lesson_id.clone(), position);

        self.bookmarks.create(&bookmark).await?;
        info!(
            "Bookmarked lesson {} at {:.1}s",
            self.context.lesson_id, position
        );
        Ok(bookmark)
    }

    fn start_playback(&mut self) {
        let state = self.session.state();
        match state.phase {
            PlaybackPhase::Uninitialized | PlaybackPhase::Loading => {
                debug!("Play requested before media is ready");
                self.play_when_ready = true;
                return;
            }
            PlaybackPhase::Error => {
                info!("Reloading lesson {} after media error", self.context.lesson_id);
                self.play_when_ready = true;
                self.session.begin_load();
                self.adapter.load();
                return;
            }
            PlaybackPhase::Playing => return,
            PlaybackPhase::Ended => {
                let duration = state.duration;
                let target = self.session.request_seek(0.0, self.fidelity.observes_playback);
                self.adapter.seek(target);
                self.checkpointer.rebase(target, duration);
                if self.session.state().is_seeking {
                    self.deferred.push_front(ControlCommand::Play);
                    return;
                }
            }
            PlaybackPhase::Ready | PlaybackPhase::Paused => {}
        }

        let position = self.session.state().current_time;
        self.recorder.record(Activity::play_from(position));
        if self.session.request_play() {
            let op = self.adapter.play();
            self.track_play(op);
            self.show_controls();
        }
    }

    fn pause_playback(&mut self) {
        self.play_when_ready = false;
        let state = self.session.state();
        if !state.is_playing && state.phase != PlaybackPhase::Playing {
            return;
        }

        let position = state.current_time;
        self.recorder.record(Activity::Pause { position });
        self.session.request_pause();
        self.adapter.pause();
        self.show_controls();
    }

    fn seek_to(&mut self, target: f64) {
        let from = self.session.state().current_time;
        let to = self
            .session
            .request_seek(target, self.fidelity.observes_playback);
        self.adapter.seek(to);
        self.checkpointer.rebase(to, self.session.state().duration);
        self.recorder.record(Activity::Seek {
            from_time: from,
            to_time: to,
        });
        self.show_controls();
    }

    fn apply_volume(&mut self, volume: f64) {
        let volume = self.session.set_volume(volume);
        self.adapter.set_volume(volume);
        self.show_controls();
    }

    fn flip_mute(&mut self) {
        let muted = !self.session.state().is_muted;
        self.session.set_muted(muted);
        self.adapter.set_muted(muted);
        self.show_controls();
    }

    fn change_rate(&mut self, rate: f64) -> PlayerResult<()> {
        let rate = PlaybackRate::try_from(rate)?;
        let from = self.session.state().playback_rate;
        if from == rate {
            return Ok(());
        }

        self.session.set_rate(rate);
        self.adapter.set_playback_rate(rate);
        self.recorder.record(Activity::SpeedChange {
            from_speed: from.value(),
            to_speed: rate.value(),
        });
        Ok(())
    }

    fn change_quality(&mut self, label: &str) {
        let label = label.trim();
        if label.is_empty() {
            warn!("Ignoring empty quality label");
            return;
        }
        let from = self.session.state().quality.clone();
        if from == label {
            return;
        }

        self.session.set_quality(label);
        self.adapter.set_quality(label);
        self.recorder.record(Activity::QualityChange {
            from_quality: from,
            to_quality: label.to_string(),
        });
    }

    fn flip_fullscreen(&mut self) {
        let entering = !self.session.state().is_fullscreen;
        self.session.set_fullscreen(entering);
        let op = if entering {
            self.adapter.request_fullscreen()
        } else {
            self.adapter.exit_fullscreen()
        };
        self.track_fullscreen(entering, op);
    }

    fn select_subtitles(&mut self, language: Option<String>) -> PlayerResult<()> {
        if let Some(code) = &language
            && !self.adapter.subtitle_languages().contains(code)
        {
            return Err(PlayerError::UnknownSubtitle {
                language: code.clone(),
            });
        }

        match self.adapter.set_subtitle(language.as_deref()) {
            Ok(()) => self.session.set_subtitle(language.as_deref()),
            Err(e) => warn!("Subtitle change not applied: {}", e),
        }
        Ok(())
    }
}
