//! Pomodoro timer engine and its persistence.
//!
//! The [`TimerEngine`] owns the live session and settings. It is driven by
//! [`TimerCommand`]s and by its own [`Schedule`] of deadlines, and reports
//! changes as [`TimerEvent`]s.

mod engine;
mod persistence;
mod schedule;

pub use engine::{TimerCommand, TimerEngine, TimerEvent, COMPLETION_PRESET, NOTIFICATION_TAG};
pub use persistence::{is_stale, restore_session, SessionPersistence, STALE_AFTER_MS};
pub use schedule::{
    Deadline, Schedule, AUTOSAVE_INTERVAL, AUTO_START_DELAY, SETTINGS_DEBOUNCE, TICK_INTERVAL,
};
