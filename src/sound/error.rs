//! Sound system error types.
//!
//! This module defines the error types for tone synthesis and playback.
//! None of these are surfaced to timer users: the notification service
//! turns them into a `false` playback result.

use thiserror::Error;

/// Errors that can occur in the sound playback system.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Audio device is not available (e.g., no speakers connected).
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),

    /// Failed to create a playback sink on the output stream.
    #[error("failed to create audio stream: {0}")]
    StreamError(String),

    /// The tone parameters cannot be synthesized.
    #[error("invalid tone parameters: {0}")]
    InvalidTone(String),

    /// Generic sound playback error.
    #[error("sound playback error: {0}")]
    PlaybackError(String),
}

impl SoundError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if retrying later could succeed.
    ///
    /// The audio context is recreated on the next play attempt after a
    /// device error; invalid tones will fail again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidTone(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "connect an audio output device",
            Self::StreamError(_) => "check your audio settings",
            Self::InvalidTone(_) => "use one of the built-in sound presets",
            Self::PlaybackError(_) => "restart the application",
        }
    }
}
