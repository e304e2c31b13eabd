//! Sound player implementation using rodio.
//!
//! The audio output stream is the process-wide audio context. It is opened
//! lazily on the first play request and reused afterwards; if opening
//! fails, the next request tries again.

use std::cell::RefCell;

use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::error::SoundError;
use super::synth::{ToneSource, ToneSpec};

/// Open output stream. The stream must be kept alive for playback.
struct AudioContext {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioContext {
    fn open() -> Result<Self, SoundError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;
        debug!("Audio output stream initialized");
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

/// A sound player that synthesizes tones through rodio.
///
/// Playback is non-blocking; tones continue playing after `play` returns.
/// The player is single-threaded: the output stream is not `Send`.
#[derive(Default)]
pub struct RodioSoundPlayer {
    context: RefCell<Option<AudioContext>>,
}

impl RodioSoundPlayer {
    /// Creates a player without touching the audio hardware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the audio context has been opened.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.context.borrow().is_some()
    }

    /// Plays a synthesized tone, opening the audio context if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available, the tone
    /// parameters are invalid, or a sink cannot be created.
    pub fn play(&self, tone: &ToneSpec) -> Result<(), SoundError> {
        let source = ToneSource::new(tone)?;

        let mut context = self.context.borrow_mut();
        if context.is_none() {
            *context = Some(AudioContext::open()?);
        }
        let Some(ctx) = context.as_ref() else {
            return Err(SoundError::DeviceNotAvailable("audio context missing".into()));
        };

        let sink = match Sink::try_new(&ctx.handle) {
            Ok(sink) => sink,
            Err(e) => {
                // The device may have gone away; reopen on the next attempt.
                warn!("Dropping audio context after sink failure: {}", e);
                *context = None;
                return Err(SoundError::StreamError(e.to_string()));
            }
        };

        sink.append(source);
        sink.detach();

        debug!(
            "Playing tone '{}' ({} Hz, {}, gain {:.2})",
            tone.preset.name, tone.preset.frequency, tone.preset.waveform, tone.gain
        );
        Ok(())
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
