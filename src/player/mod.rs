//! Playback session, control surface and input routing
//!
//! ```text
//! input ──> InputRouter ──> ControlCommand ──┐
//!                                            ├──> PlayerController ──> SourceAdapter
//! backend events ────────────────────────────┘         │
//!                                             PlaybackSession (watch)
//!                                             PositionCheckpointer / ActivityRecorder
//! ```

pub mod control;
pub mod controller;
pub mod controls_timer;
pub mod handle;
pub mod input;
pub mod session;

pub use control::ControlCommand;
pub use controller::{OpenRequest, PlayerController};
pub use controls_timer::AutoHideTimer;
pub use handle::{PlayerCommand, PlayerHandle};
pub use input::{FocusTarget, InputRouter, KeyInput, KeyOutcome, PointerIntent};
pub use session::{PlaybackSession, SessionEvent};
