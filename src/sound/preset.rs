//! Fixed registry of alert tone presets.
//!
//! Presets are keyed by a semantic tag ("timer", "medication", ...). Unknown
//! tags resolve to the "default" preset.

use std::fmt;
use std::time::Duration;

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Returns the value of the waveform at `phase` in `[0, 1)`, in `[-1, 1]`.
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesis parameters for one alert tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundPreset {
    pub name: &'static str,
    /// Oscillator frequency in Hz
    pub frequency: f32,
    /// Length of one tone in seconds
    pub duration_seconds: f32,
    pub waveform: Waveform,
    /// Number of times the tone is played back to back (1 if absent)
    pub repeat: Option<u8>,
}

impl SoundPreset {
    const fn new(name: &'static str, frequency: f32, duration_seconds: f32, waveform: Waveform) -> Self {
        Self {
            name,
            frequency,
            duration_seconds,
            waveform,
            repeat: None,
        }
    }

    const fn repeated(mut self, times: u8) -> Self {
        self.repeat = Some(times);
        self
    }

    /// Returns the preset registered under `name`, if any.
    pub fn find(name: &str) -> Option<&'static SoundPreset> {
        PRESETS.iter().find(|preset| preset.name == name)
    }

    /// Returns the preset registered under `name`, or the default preset.
    pub fn resolve(name: &str) -> &'static SoundPreset {
        Self::find(name).unwrap_or(&PRESETS[0])
    }

    /// Returns the fallback preset.
    pub fn default_preset() -> &'static SoundPreset {
        &PRESETS[0]
    }

    /// Returns every registered preset.
    pub fn all() -> &'static [SoundPreset] {
        PRESETS
    }

    /// Number of back-to-back repetitions, at least 1.
    pub fn repeat_count(&self) -> u32 {
        u32::from(self.repeat.unwrap_or(1).max(1))
    }

    /// Duration of a single tone.
    pub fn tone_duration(&self) -> Duration {
        Duration::from_secs_f32(self.duration_seconds)
    }

    /// Duration of the full playback including repeats.
    pub fn total_duration(&self) -> Duration {
        self.tone_duration() * self.repeat_count()
    }
}

/// The registry. Index 0 is the fallback.
static PRESETS: &[SoundPreset] = &[
    SoundPreset::new("default", 440.0, 0.5, Waveform::Sine),
    SoundPreset::new("medication", 830.0, 1.5, Waveform::Sine),
    SoundPreset::new("task", 700.0, 0.8, Waveform::Triangle),
    SoundPreset::new("habit", 600.0, 0.6, Waveform::Sine),
    SoundPreset::new("timer", 800.0, 0.3, Waveform::Square),
    SoundPreset::new("goal", 550.0, 1.0, Waveform::Sine),
    SoundPreset::new("urgent", 880.0, 0.2, Waveform::Sawtooth).repeated(3),
    SoundPreset::new("bell", 830.0, 1.5, Waveform::Sine),
    SoundPreset::new("beep", 800.0, 0.3, Waveform::Square),
    SoundPreset::new("chime", 1000.0, 1.0, Waveform::Sine),
    SoundPreset::new("health", 650.0, 0.7, Waveform::Sine),
];
