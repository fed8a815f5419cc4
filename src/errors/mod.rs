//! Centralized error handling for the lesson player
//!
//! Only two kinds of failure are ever meant to reach a UI: media load
//! failures and validation failures on control input. Everything else
//! (platform rejections, telemetry and checkpoint writes) is absorbed where
//! it happens and logged.
//!
//! # Error Categories
//!
//! - **Validation Errors**: out-of-range playback rate, malformed seek target
//! - **Media Errors**: network or codec failures reported by the backend
//! - **Platform Errors**: rejected play/fullscreen operations
//! - **Service Errors**: progress, activity and bookmark service I/O
//!
//! # Usage
//!
//! ```rust
//! use lesson_player::errors::{PlayerError, PlayerResult};
//!
//! fn example_function(rate: f64) -> PlayerResult<f64> {
//!     if rate <= 0.0 {
//!         return Err(PlayerError::InvalidRate { rate });
//!     }
//!     Ok(rate)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using PlayerError
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Convenience type alias for external service Results
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Convenience type alias for platform operation Results
pub type PlatformResult<T> = Result<T, PlatformError>;
