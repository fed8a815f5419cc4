//! Keyboard and pointer input routing
//!
//! [`InputRouter`] is a pure mapping from raw input to a [`ControlCommand`].
//! With shortcuts disabled, or when focus is in an editable field, key input
//! is ignored completely and the browser default is left alone. Pointer
//! intents are not shortcuts and are never gated.

use tracing::debug;

use super::control::ControlCommand;
use super::controller::PlayerController;
use crate::config::defaults::VOLUME_STEP;
use crate::errors::PlayerResult;
use crate::models::{PlaybackState, ShortcutSettings};

/// Where keyboard focus was when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Player,
    /// Text input, textarea or content-editable element
    Editable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// `KeyboardEvent.key` value, e.g. `" "`, `"ArrowLeft"`, `"f"`
    pub key: String,
    pub target: FocusTarget,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: FocusTarget::Player,
        }
    }

    pub fn in_editable(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: FocusTarget::Editable,
        }
    }
}

/// Routing decision for one key press
#[derive(Debug, Clone, PartialEq)]
pub struct KeyOutcome {
    pub command: Option<ControlCommand>,
    /// Whether the platform default (page scroll, etc.) must be suppressed
    pub prevent_default: bool,
}

impl KeyOutcome {
    pub const IGNORED: KeyOutcome = KeyOutcome {
        command: None,
        prevent_default: false,
    };

    fn handled(command: ControlCommand) -> Self {
        Self {
            command: Some(command),
            prevent_default: true,
        }
    }

    pub fn is_handled(&self) -> bool {
        self.command.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerIntent {
    /// Single click on the video surface
    VideoClick,
    VideoDoubleClick,
    /// Click on the seek bar at `fraction` of its width
    SeekBarClick { fraction: f64 },
    /// Pointer movement over the player
    Move,
}

pub struct InputRouter;

const BOUND_KEYS: [&str; 9] = [" ", "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown", "f", "F", "m", "M"];

impl InputRouter {
    /// Whether the key maps to a command under these settings, independent of
    /// playback state
    pub fn is_bound(input: &KeyInput, shortcuts: &ShortcutSettings) -> bool {
        shortcuts.enabled
            && input.target == FocusTarget::Player
            && BOUND_KEYS.contains(&input.key.as_str())
    }

    pub fn route_key(input: &KeyInput, shortcuts: &ShortcutSettings, state: &PlaybackState) -> KeyOutcome {
        if !Self::is_bound(input, shortcuts) {
            return KeyOutcome::IGNORED;
        }

        let command = match input.key.as_str() {
            " " => ControlCommand::TogglePlay,
            "ArrowLeft" => ControlCommand::Seek(state.current_time - shortcuts.skip_backward()),
            "ArrowRight" => ControlCommand::Seek(state.current_time + shortcuts.skip_forward()),
            "ArrowUp" => ControlCommand::SetVolume(step_volume(state.volume, VOLUME_STEP)),
            "ArrowDown" => ControlCommand::SetVolume(step_volume(state.volume, -VOLUME_STEP)),
            "f" | "F" => ControlCommand::ToggleFullscreen,
            "m" | "M" => ControlCommand::ToggleMute,
            _ => return KeyOutcome::IGNORED,
        };
        KeyOutcome::handled(command)
    }

    pub fn route_pointer(intent: PointerIntent, state: &PlaybackState) -> Option<ControlCommand> {
        match intent {
            PointerIntent::VideoClick => Some(ControlCommand::TogglePlay),
            PointerIntent::VideoDoubleClick => Some(ControlCommand::ToggleFullscreen),
            PointerIntent::SeekBarClick { fraction } => {
                if !fraction.is_finite() || !state.duration_known() {
                    return None;
                }
                Some(ControlCommand::Seek(fraction.clamp(0.0, 1.0) * state.duration))
            }
            PointerIntent::Move => Some(ControlCommand::ShowControls),
        }
    }
}

/// Step and clamp a volume, rounded to hundredths so repeated steps land on
/// exact tenths
fn step_volume(volume: f64, step: f64) -> f64 {
    ((volume + step) * 100.0).round().clamp(0.0, 100.0) / 100.0
}

impl PlayerController {
    /// Route a key press and execute the resulting command
    pub fn handle_key(&mut self, input: &KeyInput) -> KeyOutcome {
        let outcome = InputRouter::route_key(input, &self.settings.shortcuts, self.session.state());
        if let Some(command) = outcome.command.clone()
            && let Err(e) = self.dispatch(command)
        {
            debug!("Shortcut '{}' not applied: {}", input.key, e);
        }
        outcome
    }

    pub fn handle_pointer(&mut self, intent: PointerIntent) -> PlayerResult<()> {
        match InputRouter::route_pointer(intent, self.session.state()) {
            Some(command) => self.dispatch(command),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn state_at(time: f64, volume: f64) -> PlaybackState {
        PlaybackState {
            current_time: time,
            duration: 600.0,
            volume,
            ..PlaybackState::default()
        }
    }

    #[rstest]
    #[case(" ", ControlCommand::TogglePlay)]
    #[case("ArrowLeft", ControlCommand::Seek(40.0))]
    #[case("ArrowRight", ControlCommand::Seek(60.0))]
    #[case("ArrowUp", ControlCommand::SetVolume(0.6))]
    #[case("ArrowDown", ControlCommand::SetVolume(0.4))]
    #[case("f", ControlCommand::ToggleFullscreen)]
    #[case("F", ControlCommand::ToggleFullscreen)]
    #[case("m", ControlCommand::ToggleMute)]
    #[case("M", ControlCommand::ToggleMute)]
    fn test_key_bindings(#[case] key: &str, #[case] expected: ControlCommand) {
        let outcome = InputRouter::route_key(
            &KeyInput::new(key),
            &ShortcutSettings::default(),
            &state_at(50.0, 0.5),
        );
        assert_eq!(outcome.command, Some(expected));
        assert!(outcome.prevent_default);
    }

    #[rstest]
    #[case("a")]
    #[case("Enter")]
    #[case("Space")]
    fn test_unbound_keys_are_ignored(#[case] key: &str) {
        let outcome = InputRouter::route_key(
            &KeyInput::new(key),
            &ShortcutSettings::default(),
            &state_at(50.0, 0.5),
        );
        assert_eq!(outcome, KeyOutcome::IGNORED);
    }

    #[test]
    fn test_disabled_shortcuts_are_inert() {
        let shortcuts = ShortcutSettings {
            enabled: false,
            ..ShortcutSettings::default()
        };
        for key in [" ", "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown", "f", "m"] {
            let outcome = InputRouter::route_key(&KeyInput::new(key), &shortcuts, &state_at(50.0, 0.5));
            assert_eq!(outcome, KeyOutcome::IGNORED, "key {key:?}");
        }
    }

    #[test]
    fn test_is_bound_matches_routing() {
        let enabled = ShortcutSettings::default();
        let disabled = ShortcutSettings {
            enabled: false,
            ..ShortcutSettings::default()
        };
        let state = state_at(50.0, 0.5);
        for key in [" ", "ArrowUp", "F", "m", "a", "Enter"] {
            let input = KeyInput::new(key);
            assert_eq!(
                InputRouter::is_bound(&input, &enabled),
                InputRouter::route_key(&input, &enabled, &state).prevent_default,
                "key {key:?}"
            );
            assert!(!InputRouter::is_bound(&input, &disabled));
        }
        assert!(!InputRouter::is_bound(&KeyInput::in_editable(" "), &enabled));
    }

    #[test]
    fn test_editable_focus_is_ignored() {
        let outcome = InputRouter::route_key(
            &KeyInput::in_editable(" "),
            &ShortcutSettings::default(),
            &state_at(50.0, 0.5),
        );
        assert!(!outcome.is_handled());
        assert!(!outcome.prevent_default);
    }

    #[test]
    fn test_custom_skip_lengths() {
        let shortcuts = ShortcutSettings {
            enabled: true,
            skip_forward: 5.0,
            skip_backward: 15.0,
        };
        let state = state_at(50.0, 0.5);
        assert_eq!(
            InputRouter::route_key(&KeyInput::new("ArrowRight"), &shortcuts, &state).command,
            Some(ControlCommand::Seek(55.0))
        );
        assert_eq!(
            InputRouter::route_key(&KeyInput::new("ArrowLeft"), &shortcuts, &state).command,
            Some(ControlCommand::Seek(35.0))
        );
    }

    #[rstest]
    #[case(0.95, 0.1, 1.0)]
    #[case(0.05, -0.1, 0.0)]
    #[case(0.6, 0.1, 0.7)]
    #[case(0.7, -0.1, 0.6)]
    fn test_volume_steps_clamp(#[case] volume: f64, #[case] step: f64, #[case] expected: f64) {
        assert_eq!(step_volume(volume, step), expected);
    }

    #[test]
    fn test_pointer_intents() {
        let state = state_at(50.0, 0.5);
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::VideoClick, &state),
            Some(ControlCommand::TogglePlay)
        );
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::VideoDoubleClick, &state),
            Some(ControlCommand::ToggleFullscreen)
        );
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::SeekBarClick { fraction: 0.25 }, &state),
            Some(ControlCommand::Seek(150.0))
        );
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::SeekBarClick { fraction: 1.5 }, &state),
            Some(ControlCommand::Seek(600.0))
        );
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::Move, &state),
            Some(ControlCommand::ShowControls)
        );

        let unknown = PlaybackState::default();
        assert_eq!(
            InputRouter::route_pointer(PointerIntent::SeekBarClick { fraction: 0.5 }, &unknown),
            None
        );
    }
}
