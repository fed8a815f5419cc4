//! Cloneable handle to a spawned [`PlayerController`]
//!
//! Input is validated on the caller's side so a bad seek target or rate is
//! reported synchronously, before anything reaches the controller. Key
//! presses are routed by the controller against its live state; the handle
//! only answers whether the platform default must be suppressed.
//!
//! [`PlayerController`]: super::PlayerController

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use super::control::ControlCommand;
use super::input::{InputRouter, KeyInput, PointerIntent};
use crate::errors::{PlayerError, PlayerResult};
use crate::models::{Bookmark, PlaybackState, PlayerSettings};

#[derive(Debug)]
pub enum PlayerCommand {
    Control(ControlCommand),
    Key(KeyInput),
    Pointer(PointerIntent),
    Bookmark(oneshot::Sender<PlayerResult<Bookmark>>),
    UpdateSettings(PlayerSettings),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
    state: watch::Receiver<PlaybackState>,
    settings: Arc<watch::Sender<PlayerSettings>>,
}

impl PlayerHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<PlayerCommand>,
        state: watch::Receiver<PlaybackState>,
        settings: Arc<watch::Sender<PlayerSettings>>,
    ) -> Self {
        Self { tx, state, settings }
    }

    fn send(&self, command: PlayerCommand) -> PlayerResult<()> {
        self.tx.send(command).map_err(|_| PlayerError::ShutDown)
    }

    /// Validate and forward a control command
    pub fn control(&self, command: ControlCommand) -> PlayerResult<()> {
        command.validate()?;
        self.send(PlayerCommand::Control(command))
    }

    pub fn play(&self) -> PlayerResult<()> {
        self.control(ControlCommand::Play)
    }

    pub fn pause(&self) -> PlayerResult<()> {
        self.control(ControlCommand::Pause)
    }

    pub fn seek(&self, time: f64) -> PlayerResult<()> {
        self.control(ControlCommand::Seek(time))
    }

    pub fn set_volume(&self, volume: f64) -> PlayerResult<()> {
        self.control(ControlCommand::SetVolume(volume))
    }

    pub fn toggle_mute(&self) -> PlayerResult<()> {
        self.control(ControlCommand::ToggleMute)
    }

    pub fn set_playback_rate(&self, rate: f64) -> PlayerResult<()> {
        self.control(ControlCommand::SetPlaybackRate(rate))
    }

    pub fn set_quality(&self, label: impl Into<String>) -> PlayerResult<()> {
        self.control(ControlCommand::SetQuality(label.into()))
    }

    pub fn toggle_fullscreen(&self) -> PlayerResult<()> {
        self.control(ControlCommand::ToggleFullscreen)
    }

    pub fn set_subtitles(&self, language: Option<&str>) -> PlayerResult<()> {
        self.control(ControlCommand::SetSubtitles(language.map(str::to_string)))
    }

    /// Forward a key press. Returns whether the caller must suppress the
    /// platform default; the command itself is resolved by the controller.
    pub fn key(&self, input: KeyInput) -> PlayerResult<bool> {
        let prevent_default = InputRouter::is_bound(&input, &self.settings.borrow().shortcuts);
        self.send(PlayerCommand::Key(input))?;
        Ok(prevent_default)
    }

    pub fn pointer(&self, intent: PointerIntent) -> PlayerResult<()> {
        self.send(PlayerCommand::Pointer(intent))
    }

    pub async fn bookmark(&self) -> PlayerResult<Bookmark> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::Bookmark(reply))?;
        rx.await.map_err(|_| PlayerError::ShutDown)?
    }

    /// Replace the player settings. Keys sent after this call are routed
    /// with the new settings.
    pub fn update_settings(&self, settings: PlayerSettings) -> PlayerResult<()> {
        self.send(PlayerCommand::UpdateSettings(settings.clone()))?;
        self.settings.send_replace(settings);
        Ok(())
    }

    pub fn settings(&self) -> PlayerSettings {
        self.settings.borrow().clone()
    }

    pub fn shutdown(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::Shutdown)
    }

    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }
}
