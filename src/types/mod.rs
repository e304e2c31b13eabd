//! Core data types for the Pomodoro Timer.
//!
//! This module defines the data structures used for:
//! - Session mode and countdown state
//! - Timer settings with validation and typed updates
//! - The persisted snapshot format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of work sessions between long breaks.
pub const LONG_BREAK_INTERVAL: u32 = 4;

/// Inclusive bounds for any configured duration, in minutes.
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 180;

/// Upper bound for the volume setting.
pub const MAX_VOLUME: u8 = 100;

// ============================================================================
// TimerMode
// ============================================================================

/// The kind of interval the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerMode {
    /// A focused work interval
    #[serde(rename = "pomodoro")]
    Work,
    /// Short break between work sessions
    #[serde(rename = "shortBreak")]
    ShortBreak,
    /// Long break after every fourth work session
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl TimerMode {
    /// Returns the persisted string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "pomodoro",
            TimerMode::ShortBreak => "shortBreak",
            TimerMode::LongBreak => "longBreak",
        }
    }

    /// Returns a human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "Work",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    /// Returns true for either break mode.
    pub fn is_break(&self) -> bool {
        matches!(self, TimerMode::ShortBreak | TimerMode::LongBreak)
    }

    /// Selects the mode that follows a completed interval.
    ///
    /// `completed_work_count` is the count *after* the completion was recorded.
    pub fn next_after_completion(&self, completed_work_count: u32) -> TimerMode {
        match self {
            TimerMode::Work if completed_work_count % LONG_BREAK_INTERVAL == 0 => {
                TimerMode::LongBreak
            }
            TimerMode::Work => TimerMode::ShortBreak,
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Work,
        }
    }
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Work
    }
}

impl std::str::FromStr for TimerMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" | "work" | "w" => Ok(TimerMode::Work),
            "shortBreak" | "short-break" | "short" | "s" => Ok(TimerMode::ShortBreak),
            "longBreak" | "long-break" | "long" | "l" => Ok(TimerMode::LongBreak),
            other => Err(SettingsError::UnknownMode(other.to_string())),
        }
    }
}

// ============================================================================
// SettingsError
// ============================================================================

/// Errors raised when settings are parsed or validated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A duration was outside the accepted range.
    #[error("{key} must be between 1 and 180 minutes (got {value})")]
    DurationOutOfRange { key: &'static str, value: u32 },

    /// Volume above 100.
    #[error("volume must be between 0 and 100 (got {0})")]
    VolumeOutOfRange(u32),

    /// The setting key is not known.
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    /// The value could not be parsed for the given key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    /// The mode name is not known.
    #[error("unknown mode: {0}")]
    UnknownMode(String),
}

impl SettingsError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DurationOutOfRange { .. } => "durations are whole minutes, e.g. 25",
            Self::VolumeOutOfRange(_) => "volume is a percentage from 0 to 100",
            Self::UnknownKey(_) => {
                "known keys: work, short-break, long-break, auto-start-breaks, \
                 auto-start-pomodoros, sound, notifications, volume"
            }
            Self::InvalidValue { .. } => "booleans accept true/false/on/off",
            Self::UnknownMode(_) => "modes are work, short-break and long-break",
        }
    }
}

// ============================================================================
// TimerSettings
// ============================================================================

/// User-configurable timer settings, persisted independently of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerSettings {
    /// Work duration in minutes
    #[serde(rename = "pomodoro")]
    pub work_minutes: u32,
    /// Short break duration in minutes
    #[serde(rename = "shortBreak")]
    pub short_break_minutes: u32,
    /// Long break duration in minutes
    #[serde(rename = "longBreak")]
    pub long_break_minutes: u32,
    /// Start breaks automatically when a work session completes
    pub auto_start_breaks: bool,
    /// Start work sessions automatically when a break completes
    pub auto_start_pomodoros: bool,
    /// Alert volume (0-100)
    pub volume: u8,
    /// Play a tone when an interval completes
    pub sound_enabled: bool,
    /// Show a notification when an interval completes
    pub notifications_enabled: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            volume: 50,
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl TimerSettings {
    /// Returns the configured duration of `mode` in minutes.
    pub fn duration_minutes(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    /// Returns the configured duration of `mode` in seconds.
    pub fn duration_seconds(&self, mode: TimerMode) -> u32 {
        self.duration_minutes(mode) * 60
    }

    /// Returns whether entering `mode` after a completion should start it automatically.
    pub fn auto_starts(&self, mode: TimerMode) -> bool {
        if mode.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_pomodoros
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_duration("pomodoro", self.work_minutes)?;
        validate_duration("shortBreak", self.short_break_minutes)?;
        validate_duration("longBreak", self.long_break_minutes)?;
        if self.volume > MAX_VOLUME {
            return Err(SettingsError::VolumeOutOfRange(u32::from(self.volume)));
        }
        Ok(())
    }

    /// Applies a single update, rejecting values that would fail validation.
    pub fn apply(&mut self, update: SettingUpdate) -> Result<(), SettingsError> {
        update.validate()?;
        match update {
            SettingUpdate::WorkMinutes(v) => self.work_minutes = v,
            SettingUpdate::ShortBreakMinutes(v) => self.short_break_minutes = v,
            SettingUpdate::LongBreakMinutes(v) => self.long_break_minutes = v,
            SettingUpdate::AutoStartBreaks(v) => self.auto_start_breaks = v,
            SettingUpdate::AutoStartPomodoros(v) => self.auto_start_pomodoros = v,
            SettingUpdate::SoundEnabled(v) => self.sound_enabled = v,
            SettingUpdate::NotificationsEnabled(v) => self.notifications_enabled = v,
            SettingUpdate::Volume(v) => self.volume = v,
        }
        Ok(())
    }
}

fn validate_duration(key: &'static str, value: u32) -> Result<(), SettingsError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&value) {
        return Err(SettingsError::DurationOutOfRange { key, value });
    }
    Ok(())
}

// ============================================================================
// SettingUpdate
// ============================================================================

/// A single typed change to [`TimerSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    WorkMinutes(u32),
    ShortBreakMinutes(u32),
    LongBreakMinutes(u32),
    AutoStartBreaks(bool),
    AutoStartPomodoros(bool),
    SoundEnabled(bool),
    NotificationsEnabled(bool),
    Volume(u8),
}

impl SettingUpdate {
    /// Parses a `key`/`value` pair.
    ///
    /// Keys may be given either as the persisted JSON names (`shortBreak`)
    /// or as kebab-case aliases (`short-break`).
    pub fn parse(key: &str, value: &str) -> Result<Self, SettingsError> {
        let update = match key {
            "pomodoro" | "work" => Self::WorkMinutes(parse_minutes("pomodoro", value)?),
            "shortBreak" | "short-break" => {
                Self::ShortBreakMinutes(parse_minutes("shortBreak", value)?)
            }
            "longBreak" | "long-break" => {
                Self::LongBreakMinutes(parse_minutes("longBreak", value)?)
            }
            "autoStartBreaks" | "auto-start-breaks" => {
                Self::AutoStartBreaks(parse_bool("autoStartBreaks", value)?)
            }
            "autoStartPomodoros" | "auto-start-pomodoros" => {
                Self::AutoStartPomodoros(parse_bool("autoStartPomodoros", value)?)
            }
            "soundEnabled" | "sound" => Self::SoundEnabled(parse_bool("soundEnabled", value)?),
            "notificationsEnabled" | "notifications" => {
                Self::NotificationsEnabled(parse_bool("notificationsEnabled", value)?)
            }
            "volume" => {
                let volume: u32 = value.trim().parse().map_err(|_| SettingsError::InvalidValue {
                    key: "volume",
                    value: value.to_string(),
                })?;
                if volume > u32::from(MAX_VOLUME) {
                    return Err(SettingsError::VolumeOutOfRange(volume));
                }
                Self::Volume(volume as u8)
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        };
        update.validate()?;
        Ok(update)
    }

    /// Returns the persisted key this update writes.
    pub fn key(&self) -> &'static str {
        match self {
            Self::WorkMinutes(_) => "pomodoro",
            Self::ShortBreakMinutes(_) => "shortBreak",
            Self::LongBreakMinutes(_) => "longBreak",
            Self::AutoStartBreaks(_) => "autoStartBreaks",
            Self::AutoStartPomodoros(_) => "autoStartPomodoros",
            Self::SoundEnabled(_) => "soundEnabled",
            Self::NotificationsEnabled(_) => "notificationsEnabled",
            Self::Volume(_) => "volume",
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        match *self {
            Self::WorkMinutes(v) | Self::ShortBreakMinutes(v) | Self::LongBreakMinutes(v) => {
                validate_duration(self.key(), v)
            }
            Self::Volume(v) if v > MAX_VOLUME => {
                Err(SettingsError::VolumeOutOfRange(u32::from(v)))
            }
            _ => Ok(()),
        }
    }
}

fn parse_minutes(key: &'static str, value: &str) -> Result<u32, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// SessionRecord
// ============================================================================

/// A completed work session in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Always [`TimerMode::Work`]; only work sessions are recorded
    #[serde(rename = "type")]
    pub mode: TimerMode,
    /// Configured work duration at the time of completion
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    /// When the session completed
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// TimerSession
// ============================================================================

/// Live countdown state of the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSession {
    /// Current mode
    pub mode: TimerMode,
    /// Seconds left in the current interval
    pub remaining_seconds: u32,
    /// Whether the countdown is advancing
    pub running: bool,
    /// Completed work sessions
    pub completed_work_count: u32,
    /// Append-only list of completed work sessions
    pub history: Vec<SessionRecord>,
}

impl TimerSession {
    /// Creates a paused work session at full duration.
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            mode: TimerMode::Work,
            remaining_seconds: settings.duration_seconds(TimerMode::Work),
            running: false,
            completed_work_count: 0,
            history: Vec::new(),
        }
    }

    /// Enters `mode`, paused, with the full configured duration.
    pub fn enter_mode(&mut self, mode: TimerMode, settings: &TimerSettings) {
        self.mode = mode;
        self.running = false;
        self.remaining_seconds = settings.duration_seconds(mode);
    }

    /// Decrements the countdown by one second.
    ///
    /// Returns true if the countdown has reached 0.
    pub fn tick(&mut self) -> bool {
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
        self.remaining_seconds == 0
    }

    /// Records a completed work session and returns the new completed count.
    pub fn record_work_completion(&mut self, duration_minutes: u32, at: DateTime<Utc>) -> u32 {
        self.completed_work_count += 1;
        self.history.push(SessionRecord {
            mode: TimerMode::Work,
            duration_minutes,
            completed_at: at,
        });
        self.completed_work_count
    }

    /// Returns the elapsed share of the current interval as a percentage (0-100).
    pub fn progress_percent(&self, settings: &TimerSettings) -> f64 {
        let total = f64::from(settings.duration_seconds(self.mode));
        if total <= 0.0 {
            return 0.0;
        }
        let progress = (1.0 - f64::from(self.remaining_seconds) / total) * 100.0;
        progress.clamp(0.0, 100.0)
    }

    /// Formats the remaining time as `MM:SS`.
    pub fn formatted_remaining(&self) -> String {
        format_time(self.remaining_seconds)
    }
}

/// Formats seconds as zero-padded `MM:SS`.
pub fn format_time(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Persisted form of a [`TimerSession`] plus the time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub mode: TimerMode,
    pub time_left: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub completed_pomodoros: u32,
    #[serde(default)]
    pub session_history: Vec<SessionRecord>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl SessionSnapshot {
    /// Captures `session` as of `now`.
    pub fn capture(session: &TimerSession, now: DateTime<Utc>) -> Self {
        Self {
            mode: session.mode,
            time_left: session.remaining_seconds,
            is_active: session.running,
            completed_pomodoros: session.completed_work_count,
            session_history: session.history.clone(),
            timestamp: now.timestamp_millis(),
        }
    }

    /// Milliseconds elapsed between the snapshot and `now`.
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.timestamp
    }
}

// ============================================================================
// Tests
// ============================================================================
