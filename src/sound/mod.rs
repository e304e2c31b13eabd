//! Alert tone synthesis and playback.
//!
//! This module provides audio notification capabilities, including:
//!
//! - A fixed registry of named tone presets
//! - An oscillator source with an exponential gain envelope
//! - Non-blocking playback through a lazily opened output stream
//! - Graceful degradation when audio is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   SoundPlayer    │ ← Main interface
//! └────────┬─────────┘
//!          │ ToneSpec (preset + gain)
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │    ToneSource    │────▶│  rodio Sink      │
//! │ (oscillator +    │     │  (lazy output    │
//! │  decay envelope) │     │   stream)        │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use pomodoro::sound::{RodioSoundPlayer, SoundPlayer, ToneSpec};
//!
//! let player = RodioSoundPlayer::new();
//! if let Err(e) = player.play(&ToneSpec::new("timer", 70)) {
//!     eprintln!("Could not play sound: {}", e);
//! }
//! ```

mod error;
mod player;
mod preset;
mod synth;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use error::SoundError;
pub use player::RodioSoundPlayer;
pub use preset::{SoundPreset, Waveform};
pub use synth::{volume_to_gain, ToneSource, ToneSpec, GAIN_FLOOR, SAMPLE_RATE};

/// Trait for sound playback implementations.
///
/// This trait abstracts the sound playback functionality, allowing for
/// different implementations (e.g., rodio-based, mock for testing).
pub trait SoundPlayer {
    /// Plays a tone.
    ///
    /// This method should be non-blocking; the sound plays in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play(&self, tone: &ToneSpec) -> Result<(), SoundError>;
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, tone: &ToneSpec) -> Result<(), SoundError> {
        RodioSoundPlayer::play(self, tone)
    }
}

impl<T: SoundPlayer + ?Sized> SoundPlayer for Rc<T> {
    fn play(&self, tone: &ToneSpec) -> Result<(), SoundError> {
        (**self).play(tone)
    }
}

/// Mock sound player for testing.
///
/// Share it with the code under test through an `Rc` and inspect the
/// recorded calls afterwards.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    play_calls: RefCell<Vec<ToneSpec>>,
    should_fail: Cell<bool>,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.set(should_fail);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.borrow().len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<ToneSpec> {
        self.play_calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.play_calls.borrow_mut().clear();
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, tone: &ToneSpec) -> Result<(), SoundError> {
        if self.should_fail.get() {
            return Err(SoundError::DeviceNotAvailable("Mock failure".to_string()));
        }
        self.play_calls.borrow_mut().push(*tone);
        Ok(())
    }
}
