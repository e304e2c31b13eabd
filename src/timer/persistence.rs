//! Loading and saving the timer session and settings.
//!
//! Both values are stored as JSON strings in a [`KeyValueStore`]. Missing or
//! corrupt values fall back to defaults with a warning; loading never fails.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, StorageError, SESSION_KEY, SETTINGS_KEY};
use crate::types::{SessionSnapshot, TimerSession, TimerSettings};

/// Snapshots older than this (in milliseconds) do not restore mode, time or
/// running state.
pub const STALE_AFTER_MS: i64 = 3_600_000;

/// Reads and writes the session snapshot and settings.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Rc<dyn KeyValueStore>,
}

impl SessionPersistence {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads settings, falling back to defaults if absent or invalid.
    pub fn load_settings(&self) -> TimerSettings {
        let Some(raw) = self.read(SETTINGS_KEY) else {
            return TimerSettings::default();
        };

        let settings = match serde_json::from_str::<TimerSettings>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings: {}", e);
                return TimerSettings::default();
            }
        };

        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Ignoring invalid settings: {}", e);
                TimerSettings::default()
            }
        }
    }

    /// Writes `settings`.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the store rejects the write.
    pub fn save_settings(&self, settings: &TimerSettings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &json)?;
        debug!("Settings saved");
        Ok(())
    }

    /// Loads the stored snapshot, if present and readable.
    pub fn load_snapshot(&self) -> Option<SessionSnapshot> {
        let raw = self.read(SESSION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring unreadable session snapshot: {}", e);
                None
            }
        }
    }

    /// Loads the session as of `now`. See [`restore_session`].
    pub fn load_session(&self, settings: &TimerSettings, now: DateTime<Utc>) -> TimerSession {
        restore_session(self.load_snapshot(), settings, now)
    }

    /// Writes a snapshot of `session` stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the store rejects the write.
    pub fn save_session(
        &self,
        session: &TimerSession,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let snapshot = SessionSnapshot::capture(session, now);
        let json = serde_json::to_string(&snapshot)?;
        self.store.set(SESSION_KEY, &json)?;
        debug!(
            "Session saved: {} {}s",
            snapshot.mode.as_str(),
            snapshot.time_left
        );
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not read {}: {}", key, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence").finish_non_exhaustive()
    }
}

/// Returns true if `snapshot` is too old to restore its countdown.
pub fn is_stale(snapshot: &SessionSnapshot, now: DateTime<Utc>) -> bool {
    snapshot.age_millis(now) >= STALE_AFTER_MS
}

/// Builds the session to resume from `snapshot`.
///
/// The completed count and history are always restored. Mode and remaining
/// time are restored only from a fresh snapshot, and the session always
/// comes back paused.
pub fn restore_session(
    snapshot: Option<SessionSnapshot>,
    settings: &TimerSettings,
    now: DateTime<Utc>,
) -> TimerSession {
    let mut session = TimerSession::new(settings);
    let Some(snapshot) = snapshot else {
        return session;
    };

    session.completed_work_count = snapshot.completed_pomodoros;
    session.history = snapshot.session_history.clone();

    if is_stale(&snapshot, now) {
        info!(
            "Session snapshot is {} minutes old; starting a fresh interval",
            snapshot.age_millis(now) / 60_000
        );
        return session;
    }

    let full = settings.duration_seconds(snapshot.mode);
    session.mode = snapshot.mode;
    session.remaining_seconds = snapshot.time_left.min(full);
    if session.remaining_seconds == 0 {
        session.remaining_seconds = full;
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{SessionRecord, TimerMode};
    use chrono::Duration;

    fn persistence() -> (SessionPersistence, MemoryStore) {
        let store = MemoryStore::new();
        (SessionPersistence::new(Rc::new(store.clone())), store)
    }

    fn record(at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            mode: TimerMode::Work,
            duration_minutes: 25,
            completed_at: at,
        }
    }

    fn snapshot(mode: TimerMode, time_left: u32, age: Duration, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            mode,
            time_left,
            is_active: true,
            completed_pomodoros: 3,
            session_history: vec![record(now), record(now), record(now)],
            timestamp: (now - age).timestamp_millis(),
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_missing_settings_are_default() {
            let (persistence, _) = persistence();
            assert_eq!(persistence.load_settings(), TimerSettings::default());
        }

        #[test]
        fn test_settings_round_trip() {
            let (persistence, store) = persistence();
            let settings = TimerSettings {
                work_minutes: 50,
                volume: 80,
                auto_start_breaks: true,
                ..TimerSettings::default()
            };

            persistence.save_settings(&settings).unwrap();

            assert_eq!(store.write_count(SETTINGS_KEY), 1);
            assert_eq!(persistence.load_settings(), settings);
        }

        #[test]
        fn test_partial_settings_fill_defaults() {
            let (persistence, store) = persistence();
            store.set(SETTINGS_KEY, r#"{"pomodoro":40}"#).unwrap();

            let settings = persistence.load_settings();

            assert_eq!(settings.work_minutes, 40);
            assert_eq!(settings.short_break_minutes, 5);
        }

        #[test]
        fn test_corrupt_settings_are_default() {
            let (persistence, store) = persistence();
            store.set(SETTINGS_KEY, "{not json").unwrap();
            assert_eq!(persistence.load_settings(), TimerSettings::default());
        }

        #[test]
        fn test_out_of_range_settings_are_default() {
            let (persistence, store) = persistence();
            store.set(SETTINGS_KEY, r#"{"pomodoro":0}"#).unwrap();
            assert_eq!(persistence.load_settings(), TimerSettings::default());
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_no_snapshot_is_fresh_session() {
            let (persistence, _) = persistence();
            let settings = TimerSettings::default();

            let session = persistence.load_session(&settings, Utc::now());

            assert_eq!(session, TimerSession::new(&settings));
        }

        #[test]
        fn test_save_then_load_restores_paused() {
            let (persistence, _) = persistence();
            let settings = TimerSettings::default();
            let now = Utc::now();
            let mut session = TimerSession::new(&settings);
            session.enter_mode(TimerMode::ShortBreak, &settings);
            session.remaining_seconds = 120;
            session.running = true;
            session.record_work_completion(25, now);

            persistence.save_session(&session, now).unwrap();
            let loaded = persistence.load_session(&settings, now + Duration::minutes(5));

            assert_eq!(loaded.mode, TimerMode::ShortBreak);
            assert_eq!(loaded.remaining_seconds, 120);
            assert!(!loaded.running);
            assert_eq!(loaded.completed_work_count, 1);
            assert_eq!(loaded.history.len(), 1);
        }

        #[test]
        fn test_stale_snapshot_keeps_count_and_history() {
            let settings = TimerSettings::default();
            let now = Utc::now();
            let snap = snapshot(TimerMode::LongBreak, 42, Duration::hours(2), now);

            let session = restore_session(Some(snap), &settings, now);

            assert_eq!(session.mode, TimerMode::Work);
            assert_eq!(session.remaining_seconds, 25 * 60);
            assert!(!session.running);
            assert_eq!(session.completed_work_count, 3);
            assert_eq!(session.history.len(), 3);
        }

        #[test]
        fn test_staleness_boundary() {
            let now = Utc::now();
            let just_fresh = snapshot(TimerMode::Work, 10, Duration::milliseconds(STALE_AFTER_MS - 1), now);
            let just_stale = snapshot(TimerMode::Work, 10, Duration::milliseconds(STALE_AFTER_MS), now);

            assert!(!is_stale(&just_fresh, now));
            assert!(is_stale(&just_stale, now));
        }

        #[test]
        fn test_remaining_clamped_to_mode_duration() {
            let settings = TimerSettings::default();
            let now = Utc::now();
            let snap = snapshot(TimerMode::ShortBreak, 9_999, Duration::seconds(1), now);

            let session = restore_session(Some(snap), &settings, now);

            assert_eq!(session.remaining_seconds, 5 * 60);
        }

        #[test]
        fn test_zero_remaining_restores_full_interval() {
            let settings = TimerSettings::default();
            let now = Utc::now();
            let snap = snapshot(TimerMode::ShortBreak, 0, Duration::seconds(1), now);

            let session = restore_session(Some(snap), &settings, now);

            assert_eq!(session.remaining_seconds, 5 * 60);
        }

        #[test]
        fn test_corrupt_snapshot_is_ignored() {
            let (persistence, store) = persistence();
            store.set(SESSION_KEY, "[1,2").unwrap();

            assert!(persistence.load_snapshot().is_none());
            let session = persistence.load_session(&TimerSettings::default(), Utc::now());
            assert_eq!(session.completed_work_count, 0);
        }

        #[test]
        fn test_snapshot_json_shape() {
            let (persistence, store) = persistence();
            let settings = TimerSettings::default();
            let now = Utc::now();

            persistence.save_session(&TimerSession::new(&settings), now).unwrap();

            let raw = store.get(SESSION_KEY).unwrap().unwrap();
            let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(value["mode"], "pomodoro");
            assert_eq!(value["timeLeft"], 1500);
            assert_eq!(value["isActive"], false);
            assert_eq!(value["completedPomodoros"], 0);
            assert_eq!(value["timestamp"], now.timestamp_millis());
        }
    }
}
