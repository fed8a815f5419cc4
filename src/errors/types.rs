//! Error type definitions for the lesson player

use thiserror::Error;

/// Top-level player error type
///
/// Returned from the control surface and the controller lifecycle. Validation
/// variants are produced before any backend mutation, so a returned error
/// always means no state changed.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Playback rate outside the allowed discrete set
    #[error("Invalid playback rate: {rate} (allowed: 0.5, 0.75, 1, 1.25, 1.5, 2)")]
    InvalidRate { rate: f64 },

    /// Seek target that is not a finite number
    #[error("Invalid seek target: {target}")]
    InvalidSeek { target: f64 },

    /// Volume that is not a finite number
    #[error("Invalid volume: {volume}")]
    InvalidVolume { volume: f64 },

    /// Subtitle language with no matching track
    #[error("No subtitle track for language '{language}'")]
    UnknownSubtitle { language: String },

    /// The controller has already been torn down
    #[error("Player session has been shut down")]
    ShutDown,

    /// External service errors that are surfaced to the caller
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Settings persistence errors
    #[error("Settings error: {0}")]
    Settings(#[from] std::io::Error),

    /// Settings (de)serialization errors
    #[error("Settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

/// Rejections reported by asynchronous platform operations
///
/// These mirror what a browser reports for `HTMLMediaElement.play()` and
/// `Element.requestFullscreen()`. None of them is ever surfaced to the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// A pending `play()` was superseded by a later `pause()`
    #[error("Play request interrupted by a pause")]
    Interrupted,

    /// The platform refused the request (autoplay policy, fullscreen permission)
    #[error("Operation not allowed: {reason}")]
    NotAllowed { reason: String },

    /// The backend does not support the requested operation
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    /// The backend element is gone (teardown or unmount)
    #[error("Backend detached")]
    Detached,
}

/// External service specific errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Transport-level failures
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status codes
    #[error("{service} returned {status}: {message}")]
    Status {
        service: String,
        status: u16,
        message: String,
    },

    /// URL construction failures
    #[error("Invalid service URL: {0}")]
    Url(#[from] url::ParseError),
}

impl PlatformError {
    /// Create a not-allowed rejection
    pub fn not_allowed<S: Into<String>>(reason: S) -> Self {
        Self::NotAllowed {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation rejection
    pub fn unsupported<S: Into<String>>(operation: S) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

impl ServiceError {
    /// Create a status error for a named service
    pub fn status<S: Into<String>, M: Into<String>>(service: S, status: u16, message: M) -> Self {
        Self::Status {
            service: service.into(),
            status,
            message: message.into(),
        }
    }
}
