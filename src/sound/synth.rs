//! Oscillator-based tone synthesis.
//!
//! A tone is a single oscillator whose gain starts at the requested volume
//! and decays exponentially to [`GAIN_FLOOR`] over the preset's duration.
//! [`ToneSource`] implements [`rodio::Source`] so it can be appended to a sink.

use std::time::Duration;

use rodio::Source;

use super::error::SoundError;
use super::preset::{SoundPreset, Waveform};

/// Output sample rate of synthesized tones.
pub const SAMPLE_RATE: u32 = 44_100;

/// Gain the envelope decays to at the end of each tone.
pub const GAIN_FLOOR: f32 = 0.001;

/// A resolved request to play a preset at a given gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub preset: SoundPreset,
    /// Initial amplitude in `[0, 1]`
    pub gain: f32,
}

impl ToneSpec {
    /// Resolves `preset_name` (falling back to "default") and converts a
    /// 0-100 volume into a clamped gain.
    pub fn new(preset_name: &str, volume: u32) -> Self {
        Self::from_preset(*SoundPreset::resolve(preset_name), volume)
    }

    pub fn from_preset(preset: SoundPreset, volume: u32) -> Self {
        Self {
            preset,
            gain: volume_to_gain(volume),
        }
    }
}

/// Converts a 0-100 volume into a gain clamped to `[0, 1]`.
pub fn volume_to_gain(volume: u32) -> f32 {
    (volume as f32 / 100.0).clamp(0.0, 1.0)
}

/// Sample iterator for one [`ToneSpec`], including repeats.
#[derive(Debug, Clone)]
pub struct ToneSource {
    waveform: Waveform,
    frequency: f32,
    gain: f32,
    sample_rate: u32,
    samples_per_tone: usize,
    total_samples: usize,
    position: usize,
}

impl ToneSource {
    /// Creates a source at [`SAMPLE_RATE`].
    ///
    /// # Errors
    ///
    /// Returns `SoundError::InvalidTone` if the preset's frequency is not
    /// representable at the sample rate or its duration is not positive.
    pub fn new(spec: &ToneSpec) -> Result<Self, SoundError> {
        Self::with_sample_rate(spec, SAMPLE_RATE)
    }

    pub fn with_sample_rate(spec: &ToneSpec, sample_rate: u32) -> Result<Self, SoundError> {
        let preset = &spec.preset;
        let nyquist = sample_rate as f32 / 2.0;
        if !(preset.frequency > 0.0 && preset.frequency < nyquist) {
            return Err(SoundError::InvalidTone(format!(
                "{}: frequency {} Hz outside (0, {}) Hz",
                preset.name, preset.frequency, nyquist
            )));
        }
        if !(preset.duration_seconds > 0.0 && preset.duration_seconds.is_finite()) {
            return Err(SoundError::InvalidTone(format!(
                "{}: duration {} s is not positive",
                preset.name, preset.duration_seconds
            )));
        }

        let samples_per_tone =
            ((preset.duration_seconds * sample_rate as f32).round() as usize).max(1);
        let total_samples = samples_per_tone * preset.repeat_count() as usize;

        Ok(Self {
            waveform: preset.waveform,
            frequency: preset.frequency,
            gain: spec.gain.clamp(0.0, 1.0),
            sample_rate,
            samples_per_tone,
            total_samples,
            position: 0,
        })
    }

    /// Total number of samples this source yields.
    pub fn len_samples(&self) -> usize {
        self.total_samples
    }

    /// Gain at `elapsed` seconds into a tone lasting `tone_seconds`.
    fn envelope(&self, elapsed: f32, tone_seconds: f32) -> f32 {
        if self.gain <= 0.0 {
            return 0.0;
        }
        self.gain * (GAIN_FLOOR / self.gain).powf(elapsed / tone_seconds)
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total_samples {
            return None;
        }
        let offset = self.position % self.samples_per_tone;
        self.position += 1;

        let rate = self.sample_rate as f32;
        let elapsed = offset as f32 / rate;
        let tone_seconds = self.samples_per_tone as f32 / rate;
        let phase = (elapsed * self.frequency).fract();

        Some(self.waveform.sample(phase) * self.envelope(elapsed, tone_seconds))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_samples - self.position;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ToneSource {}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.position)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_samples as f64 / f64::from(self.sample_rate),
        ))
    }
}
