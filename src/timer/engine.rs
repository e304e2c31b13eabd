//! Timer engine for the Pomodoro Timer.
//!
//! This module provides the core timer functionality:
//! - Countdown re-armed one second at a time
//! - Completion side effects (sound, notification, toast event)
//! - Mode selection with a long break after every fourth work session
//! - Delayed auto-start, periodic auto-save and debounced settings writes

use std::rc::Rc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::persistence::SessionPersistence;
use super::schedule::{
    Deadline, Schedule, AUTOSAVE_INTERVAL, AUTO_START_DELAY, SETTINGS_DEBOUNCE, TICK_INTERVAL,
};
use crate::notification::{NotificationRequest, NotificationService};
use crate::sound::ToneSpec;
use crate::types::{SettingUpdate, SettingsError, TimerMode, TimerSession, TimerSettings};

/// Sound preset played when an interval completes.
pub const COMPLETION_PRESET: &str = "timer";

/// Tag carried by completion notifications.
pub const NOTIFICATION_TAG: &str = "pomodoro-timer";

// ============================================================================
// TimerEvent / TimerCommand
// ============================================================================

/// Timer events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed
    Tick {
        /// Remaining seconds
        remaining_seconds: u32,
    },
    /// Countdown started or paused
    RunningChanged { running: bool },
    /// A new mode was entered
    ModeChanged {
        mode: TimerMode,
        /// Whether the countdown will start by itself after a short delay
        auto_start: bool,
    },
    /// The current interval was reset to its full duration
    Reset { remaining_seconds: u32 },
    /// An interval finished; carries the toast text
    SessionCompleted {
        mode: TimerMode,
        title: String,
        description: String,
    },
    /// Settings changed
    SettingsChanged(TimerSettings),
}

/// Commands accepted by [`TimerEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Toggle,
    Reset,
    SwitchMode(TimerMode),
    UpdateSetting(SettingUpdate),
    /// Stops the loop and cancels all pending delayed work
    Shutdown,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that manages the Pomodoro session and its delayed work.
///
/// All operations take the current instant so the engine can be driven
/// directly in tests; [`TimerEngine::run`] drives it from a command
/// channel and the tokio clock.
pub struct TimerEngine {
    session: TimerSession,
    settings: TimerSettings,
    persistence: SessionPersistence,
    notifier: Rc<NotificationService>,
    schedule: Schedule,
    /// Set once the side effects for the current zero-crossing have run
    completion_handled: bool,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an engine from explicit state.
    pub fn new(
        session: TimerSession,
        settings: TimerSettings,
        persistence: SessionPersistence,
        notifier: Rc<NotificationService>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        Self {
            session,
            settings,
            persistence,
            notifier,
            schedule: Schedule::new(),
            completion_handled: false,
            event_tx,
        }
    }

    /// Creates an engine from the stored settings and session snapshot.
    pub fn load(
        persistence: SessionPersistence,
        notifier: Rc<NotificationService>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let settings = persistence.load_settings();
        let session = persistence.load_session(&settings, Utc::now());
        info!(
            "Loaded session: {} {} ({} completed)",
            session.mode.label(),
            session.formatted_remaining(),
            session.completed_work_count
        );
        Self::new(session, settings, persistence, notifier, event_tx)
    }

    /// Returns the current session.
    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    /// Returns the current settings.
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Returns the pending delayed work.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Returns the elapsed share of the current interval (0-100).
    pub fn progress_percent(&self) -> f64 {
        self.session.progress_percent(&self.settings)
    }

    /// Returns a mutable reference to the session (for testing).
    #[cfg(test)]
    pub fn session_mut(&mut self) -> &mut TimerSession {
        &mut self.session
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Starts or pauses the countdown.
    ///
    /// Starting at 0 remaining is a no-op: the completion for that zero has
    /// already been handled or is about to be.
    pub fn toggle_running(&mut self, now: Instant) {
        if self.session.running {
            self.session.running = false;
            self.cancel_countdown();
            self.persist();
            info!("Timer paused at {}", self.session.formatted_remaining());
        } else {
            if self.session.remaining_seconds == 0 {
                debug!("Ignoring start at 00:00");
                return;
            }
            self.start_countdown(now);
            info!("Timer started at {}", self.session.formatted_remaining());
        }
        self.emit(TimerEvent::RunningChanged {
            running: self.session.running,
        });
    }

    /// Stops the countdown and restores the full duration of the current mode.
    pub fn reset(&mut self) {
        self.session.running = false;
        self.cancel_countdown();
        self.session.remaining_seconds = self.settings.duration_seconds(self.session.mode);
        self.completion_handled = false;
        self.persist();
        info!("Timer reset to {}", self.session.formatted_remaining());
        self.emit(TimerEvent::Reset {
            remaining_seconds: self.session.remaining_seconds,
        });
    }

    /// Enters `mode`, paused, at its full duration. Never auto-starts.
    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.cancel_countdown();
        self.session.enter_mode(mode, &self.settings);
        self.completion_handled = false;
        self.persist();
        info!("Switched to {}", mode.label());
        self.emit(TimerEvent::ModeChanged {
            mode,
            auto_start: false,
        });
    }

    /// Applies a setting change and schedules a debounced write.
    ///
    /// The remaining time of the current interval is left as is.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if the value is out of range; nothing
    /// changes in that case.
    pub fn update_setting(
        &mut self,
        update: SettingUpdate,
        now: Instant,
    ) -> Result<(), SettingsError> {
        self.settings.apply(update)?;
        self.schedule.arm(Deadline::SettingsFlush, now + SETTINGS_DEBOUNCE);
        debug!("Setting {} updated", update.key());
        self.emit(TimerEvent::SettingsChanged(self.settings.clone()));
        Ok(())
    }

    /// Returns the earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.next()
    }

    /// Runs every deadline that is due at `now`.
    pub fn fire_due(&mut self, now: Instant) {
        while let Some(deadline) = self.schedule.take_due(now) {
            match deadline {
                Deadline::Tick => self.on_tick(now),
                Deadline::AutoStart => self.on_auto_start(now),
                Deadline::AutoSave => self.on_autosave(now),
                Deadline::SettingsFlush => self.flush_settings(),
            }
        }
    }

    /// Cancels all pending delayed work without writing anything.
    pub fn shutdown(&mut self) {
        self.schedule.cancel_all();
        debug!("Timer engine shut down");
    }

    /// Runs the engine until `Shutdown` is received or the channel closes.
    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<TimerCommand>) {
        loop {
            let next = self.schedule.next();
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(TimerCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command, Instant::now()),
                },
                () = sleep_until_next(next) => self.fire_due(Instant::now()),
            }
        }
        self.shutdown();
    }

    /// Applies a single command at `now`.
    pub fn apply(&mut self, command: TimerCommand, now: Instant) {
        match command {
            TimerCommand::Toggle => self.toggle_running(now),
            TimerCommand::Reset => self.reset(),
            TimerCommand::SwitchMode(mode) => self.switch_mode(mode),
            TimerCommand::UpdateSetting(update) => {
                if let Err(e) = self.update_setting(update, now) {
                    warn!("Rejected setting: {}", e);
                }
            }
            TimerCommand::Shutdown => self.shutdown(),
        }
    }

    // ------------------------------------------------------------------------
    // Deadlines
    // ------------------------------------------------------------------------

    fn on_tick(&mut self, now: Instant) {
        if !self.session.running {
            return;
        }

        let reached_zero = self.session.tick();
        self.emit(TimerEvent::Tick {
            remaining_seconds: self.session.remaining_seconds,
        });

        if reached_zero {
            self.handle_timer_complete(now);
        } else {
            self.schedule.arm(Deadline::Tick, now + TICK_INTERVAL);
        }
    }

    fn on_auto_start(&mut self, now: Instant) {
        if self.session.running || self.session.remaining_seconds == 0 {
            return;
        }
        self.start_countdown(now);
        info!("Auto-started {}", self.session.mode.label());
        self.emit(TimerEvent::RunningChanged { running: true });
    }

    fn on_autosave(&mut self, now: Instant) {
        if !self.session.running {
            return;
        }
        self.persist();
        self.schedule.arm(Deadline::AutoSave, now + AUTOSAVE_INTERVAL);
    }

    fn flush_settings(&self) {
        if let Err(e) = self.persistence.save_settings(&self.settings) {
            warn!("Failed to save settings: {}", e);
        }
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    /// Handles a countdown reaching zero.
    fn handle_timer_complete(&mut self, now: Instant) {
        if self.completion_handled || self.session.remaining_seconds > 0 {
            return;
        }
        self.completion_handled = true;

        let finished = self.session.mode;
        self.cancel_countdown();
        self.announce_completion(finished);

        if finished == TimerMode::Work {
            let count = self
                .session
                .record_work_completion(self.settings.work_minutes, Utc::now());
            info!("Work session completed ({} total)", count);
        } else {
            info!("{} completed", finished.label());
        }

        let next = finished.next_after_completion(self.session.completed_work_count);
        self.session.enter_mode(next, &self.settings);
        self.completion_handled = false;

        let auto_start = self.settings.auto_starts(next);
        if auto_start {
            self.schedule.arm(Deadline::AutoStart, now + AUTO_START_DELAY);
        }

        self.persist();
        self.emit(TimerEvent::ModeChanged {
            mode: next,
            auto_start,
        });
    }

    /// Plays the completion tone, shows the notification and emits the toast.
    fn announce_completion(&self, finished: TimerMode) {
        let volume = u32::from(self.settings.volume);

        if self.settings.notifications_enabled {
            let (title, body) = notification_text(finished);
            let request = NotificationRequest::new(title)
                .with_body(body)
                .with_tag(NOTIFICATION_TAG);
            let tone = self
                .settings
                .sound_enabled
                .then(|| ToneSpec::new(COMPLETION_PRESET, volume));
            self.notifier.deliver(&request, tone);
        } else if self.settings.sound_enabled {
            self.notifier.play_sound(COMPLETION_PRESET, volume);
        }

        let (title, description) = toast_text(finished);
        self.emit(TimerEvent::SessionCompleted {
            mode: finished,
            title: title.to_string(),
            description: description.to_string(),
        });
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn start_countdown(&mut self, now: Instant) {
        self.session.running = true;
        self.schedule.cancel(Deadline::AutoStart);
        self.schedule.arm(Deadline::Tick, now + TICK_INTERVAL);
        self.schedule.arm(Deadline::AutoSave, now + AUTOSAVE_INTERVAL);
    }

    fn cancel_countdown(&mut self) {
        self.schedule.cancel(Deadline::Tick);
        self.schedule.cancel(Deadline::AutoSave);
        self.schedule.cancel(Deadline::AutoStart);
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save_session(&self.session, Utc::now()) {
            warn!("Failed to save session: {}", e);
        }
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No timer event listener");
        }
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

async fn sleep_until_next(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// System notification title and body for a finished interval.
fn notification_text(finished: TimerMode) -> (&'static str, &'static str) {
    match finished {
        TimerMode::Work => ("Work session completed!", "Time to take a break!"),
        TimerMode::ShortBreak | TimerMode::LongBreak => {
            ("Break time over!", "Time to get back to work!")
        }
    }
}

/// Toast title and description for a finished interval.
fn toast_text(finished: TimerMode) -> (&'static str, &'static str) {
    match finished {
        TimerMode::Work => ("Work session completed!", "Time to take a break!"),
        TimerMode::ShortBreak | TimerMode::LongBreak => {
            ("Break completed!", "Time to get back to work!")
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MockNotificationHost, PermissionState};
    use crate::sound::MockSoundPlayer;
    use crate::storage::{KeyValueStore, MemoryStore, SESSION_KEY, SETTINGS_KEY};

    struct Harness {
        engine: TimerEngine,
        events: mpsc::UnboundedReceiver<TimerEvent>,
        store: MemoryStore,
        host: Rc<MockNotificationHost>,
        sound: Rc<MockSoundPlayer>,
        notifier: Rc<NotificationService>,
    }

    impl Harness {
        fn new(settings: TimerSettings) -> Self {
            let store = MemoryStore::new();
            let host = Rc::new(MockNotificationHost::with_permission(PermissionState::Granted));
            let sound = Rc::new(MockSoundPlayer::new());
            let notifier = Rc::new(NotificationService::new(
                Box::new(Rc::clone(&host)),
                Box::new(Rc::clone(&sound)),
            ));
            let (tx, events) = mpsc::unbounded_channel();
            let persistence = SessionPersistence::new(Rc::new(store.clone()));
            let session = TimerSession::new(&settings);
            let engine = TimerEngine::new(session, settings, persistence, Rc::clone(&notifier), tx);
            Self {
                engine,
                events,
                store,
                host,
                sound,
                notifier,
            }
        }

        fn drain(&mut self) -> Vec<TimerEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }

        /// Fires every deadline up to `now + secs`, one second at a time.
        fn advance(&mut self, now: &mut Instant, secs: u64) {
            for _ in 0..secs {
                *now += TICK_INTERVAL;
                self.engine.fire_due(*now);
            }
        }
    }

    fn completed_events(events: &[TimerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TimerEvent::SessionCompleted { .. }))
            .count()
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_toggle_starts_and_pauses() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();

            h.engine.toggle_running(now);
            assert!(h.engine.session().running);
            assert_eq!(h.engine.next_deadline(), Some(now + TICK_INTERVAL));

            h.engine.toggle_running(now);
            assert!(!h.engine.session().running);
            assert!(!h.engine.schedule().is_armed(Deadline::Tick));
            assert!(!h.engine.schedule().is_armed(Deadline::AutoSave));

            assert_eq!(
                h.drain(),
                vec![
                    TimerEvent::RunningChanged { running: true },
                    TimerEvent::RunningChanged { running: false },
                ]
            );
        }

        #[test]
        fn test_toggle_twice_without_tick_keeps_remaining() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();

            h.engine.toggle_running(now);
            h.engine.toggle_running(now);

            assert_eq!(h.engine.session().remaining_seconds, 25 * 60);
        }

        #[test]
        fn test_toggle_at_zero_is_noop() {
            let mut h = Harness::new(TimerSettings::default());
            h.engine.session_mut().remaining_seconds = 0;

            h.engine.toggle_running(Instant::now());

            assert!(!h.engine.session().running);
            assert_eq!(h.engine.next_deadline(), None);
            assert!(h.drain().is_empty());
            assert_eq!(h.sound.play_count(), 0);
        }

        #[test]
        fn test_pause_persists() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();
            h.engine.toggle_running(now);
            h.store.clear_write_log();

            h.engine.toggle_running(now);

            assert_eq!(h.store.write_count(SESSION_KEY), 1);
        }

        #[test]
        fn test_reset_restores_full_duration() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.toggle_running(now);
            h.advance(&mut now, 30);

            h.engine.reset();

            assert!(!h.engine.session().running);
            assert_eq!(h.engine.session().remaining_seconds, 25 * 60);
            assert_eq!(h.engine.next_deadline(), None);
            assert!(h.store.write_count(SESSION_KEY) >= 1);
            assert_eq!(
                h.drain().last(),
                Some(&TimerEvent::Reset {
                    remaining_seconds: 1500
                })
            );
        }

        #[test]
        fn test_switch_mode_never_auto_starts() {
            let settings = TimerSettings {
                auto_start_breaks: true,
                auto_start_pomodoros: true,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let now = Instant::now();
            h.engine.toggle_running(now);

            h.engine.switch_mode(TimerMode::LongBreak);

            assert_eq!(h.engine.session().mode, TimerMode::LongBreak);
            assert_eq!(h.engine.session().remaining_seconds, 15 * 60);
            assert!(!h.engine.session().running);
            assert_eq!(h.engine.next_deadline(), None);
            assert_eq!(
                h.drain().last(),
                Some(&TimerEvent::ModeChanged {
                    mode: TimerMode::LongBreak,
                    auto_start: false
                })
            );
        }

        #[test]
        fn test_progress_percent() {
            let mut h = Harness::new(TimerSettings::default());
            assert_eq!(h.engine.progress_percent(), 0.0);

            h.engine.session_mut().remaining_seconds = 750;
            assert!((h.engine.progress_percent() - 50.0).abs() < f64::EPSILON);
        }
    }

    mod tick_tests {
        use super::*;

        #[test]
        fn test_tick_decrements_and_rearms() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.toggle_running(now);
            h.drain();

            h.advance(&mut now, 3);

            assert_eq!(h.engine.session().remaining_seconds, 1497);
            assert_eq!(
                h.engine.schedule().when(Deadline::Tick),
                Some(now + TICK_INTERVAL)
            );
            assert_eq!(
                h.drain(),
                vec![
                    TimerEvent::Tick { remaining_seconds: 1499 },
                    TimerEvent::Tick { remaining_seconds: 1498 },
                    TimerEvent::Tick { remaining_seconds: 1497 },
                ]
            );
        }

        #[test]
        fn test_no_tick_before_deadline() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();
            h.engine.toggle_running(now);

            h.engine.fire_due(now + TICK_INTERVAL / 2);

            assert_eq!(h.engine.session().remaining_seconds, 1500);
        }

        #[test]
        fn test_autosave_every_ten_seconds() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.toggle_running(now);
            h.store.clear_write_log();

            h.advance(&mut now, 9);
            assert_eq!(h.store.write_count(SESSION_KEY), 0);

            h.advance(&mut now, 1);
            assert_eq!(h.store.write_count(SESSION_KEY), 1);

            h.advance(&mut now, 10);
            assert_eq!(h.store.write_count(SESSION_KEY), 2);
        }

        #[test]
        fn test_stale_tick_after_pause_does_nothing() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();
            h.engine.toggle_running(now);
            h.engine.toggle_running(now);

            h.engine.fire_due(now + TICK_INTERVAL * 5);

            assert_eq!(h.engine.session().remaining_seconds, 1500);
        }
    }

    mod completion_tests {
        use super::*;

        #[test]
        fn test_work_completion_goes_to_short_break() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);
            h.drain();

            h.advance(&mut now, 1);

            let session = h.engine.session();
            assert_eq!(session.mode, TimerMode::ShortBreak);
            assert_eq!(session.remaining_seconds, 5 * 60);
            assert!(!session.running);
            assert_eq!(session.completed_work_count, 1);
            assert_eq!(session.history.len(), 1);
            assert_eq!(session.history[0].duration_minutes, 25);

            let events = h.drain();
            assert_eq!(events[0], TimerEvent::Tick { remaining_seconds: 0 });
            assert_eq!(
                events[1],
                TimerEvent::SessionCompleted {
                    mode: TimerMode::Work,
                    title: "Work session completed!".to_string(),
                    description: "Time to take a break!".to_string(),
                }
            );
            assert_eq!(
                events[2],
                TimerEvent::ModeChanged {
                    mode: TimerMode::ShortBreak,
                    auto_start: false
                }
            );
            assert_eq!(h.engine.next_deadline(), None);
        }

        #[test]
        fn test_fourth_completion_goes_to_long_break() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.session_mut().completed_work_count = 3;
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            assert_eq!(h.engine.session().mode, TimerMode::LongBreak);
            assert_eq!(h.engine.session().completed_work_count, 4);
        }

        #[test]
        fn test_break_completion_returns_to_work_without_record() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.switch_mode(TimerMode::ShortBreak);
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);
            h.drain();

            h.advance(&mut now, 1);

            assert_eq!(h.engine.session().mode, TimerMode::Work);
            assert_eq!(h.engine.session().completed_work_count, 0);
            assert!(h.engine.session().history.is_empty());
            let events = h.drain();
            assert!(events.contains(&TimerEvent::SessionCompleted {
                mode: TimerMode::ShortBreak,
                title: "Break completed!".to_string(),
                description: "Time to get back to work!".to_string(),
            }));
        }

        #[test]
        fn test_completion_side_effects_fire_once() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 5);

            assert_eq!(h.sound.play_count(), 1);
            assert_eq!(h.sound.get_play_calls()[0].preset.name, COMPLETION_PRESET);
            assert_eq!(h.host.display_count(), 1);
            let shown = &h.host.displayed()[0];
            assert_eq!(shown.title, "Work session completed!");
            assert_eq!(shown.body(), "Time to take a break!");
            assert_eq!(shown.tag(), NOTIFICATION_TAG);
            assert_eq!(completed_events(&h.drain()), 1);
        }

        #[test]
        fn test_break_notification_text() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.switch_mode(TimerMode::LongBreak);
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            let shown = &h.host.displayed()[0];
            assert_eq!(shown.title, "Break time over!");
            assert_eq!(shown.body(), "Time to get back to work!");
        }

        #[test]
        fn test_sound_only_when_notifications_disabled() {
            let settings = TimerSettings {
                notifications_enabled: false,
                volume: 70,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            assert_eq!(h.sound.play_count(), 1);
            assert!((h.sound.get_play_calls()[0].gain - 0.7).abs() < 1e-6);
            assert_eq!(h.host.display_count(), 0);
            assert!(h.notifier.last_in_app().is_none());
        }

        #[test]
        fn test_notification_without_sound() {
            let settings = TimerSettings {
                sound_enabled: false,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            assert_eq!(h.sound.play_count(), 0);
            assert_eq!(h.host.display_count(), 1);
        }

        #[test]
        fn test_silent_completion() {
            let settings = TimerSettings {
                sound_enabled: false,
                notifications_enabled: false,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            assert_eq!(h.sound.play_count(), 0);
            assert_eq!(h.host.display_count(), 0);
            assert_eq!(completed_events(&h.drain()), 1);
        }

        #[test]
        fn test_denied_permission_falls_back_in_app() {
            let mut h = Harness::new(TimerSettings::default());
            h.host.set_permission(PermissionState::Denied);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);

            h.advance(&mut now, 1);

            assert_eq!(h.host.display_count(), 0);
            let in_app = h.notifier.last_in_app().unwrap();
            assert_eq!(in_app.title, "Work session completed!");
            assert_eq!(h.sound.play_count(), 1);
        }

        #[test]
        fn test_completion_persists_immediately() {
            let mut h = Harness::new(TimerSettings::default());
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);
            h.store.clear_write_log();

            h.advance(&mut now, 1);

            assert_eq!(h.store.write_count(SESSION_KEY), 1);
            let raw = h.store.get(SESSION_KEY).unwrap().unwrap();
            assert!(raw.contains("\"mode\":\"shortBreak\""));
            assert!(raw.contains("\"completedPomodoros\":1"));
        }

        #[test]
        fn test_auto_start_after_delay() {
            let settings = TimerSettings {
                auto_start_breaks: true,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);
            h.advance(&mut now, 1);

            assert!(!h.engine.session().running);
            assert_eq!(
                h.engine.schedule().when(Deadline::AutoStart),
                Some(now + AUTO_START_DELAY)
            );
            h.drain();

            h.advance(&mut now, 1);

            assert!(h.engine.session().running);
            assert_eq!(h.engine.session().remaining_seconds, 5 * 60);
            assert_eq!(h.drain(), vec![TimerEvent::RunningChanged { running: true }]);
        }

        #[test]
        fn test_switch_mode_cancels_pending_auto_start() {
            let settings = TimerSettings {
                auto_start_breaks: true,
                ..TimerSettings::default()
            };
            let mut h = Harness::new(settings);
            let mut now = Instant::now();
            h.engine.session_mut().remaining_seconds = 1;
            h.engine.toggle_running(now);
            h.advance(&mut now, 1);

            h.engine.switch_mode(TimerMode::Work);
            h.advance(&mut now, 2);

            assert!(!h.engine.session().running);
            assert_eq!(h.engine.session().remaining_seconds, 25 * 60);
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_update_does_not_touch_remaining() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();

            h.engine
                .update_setting(SettingUpdate::WorkMinutes(50), now)
                .unwrap();

            assert_eq!(h.engine.settings().work_minutes, 50);
            assert_eq!(h.engine.session().remaining_seconds, 25 * 60);

            h.engine.reset();
            assert_eq!(h.engine.session().remaining_seconds, 50 * 60);
        }

        #[test]
        fn test_settings_write_is_debounced() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();

            h.engine
                .update_setting(SettingUpdate::Volume(10), now)
                .unwrap();
            h.engine
                .update_setting(SettingUpdate::Volume(20), now + TICK_INTERVAL / 2)
                .unwrap();

            h.engine.fire_due(now + SETTINGS_DEBOUNCE);
            assert_eq!(h.store.write_count(SETTINGS_KEY), 0);

            h.engine.fire_due(now + TICK_INTERVAL / 2 + SETTINGS_DEBOUNCE);
            assert_eq!(h.store.write_count(SETTINGS_KEY), 1);
            let raw = h.store.get(SETTINGS_KEY).unwrap().unwrap();
            assert!(raw.contains("\"volume\":20"));
        }

        #[test]
        fn test_invalid_update_is_rejected() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();

            let err = h
                .engine
                .update_setting(SettingUpdate::WorkMinutes(0), now)
                .unwrap_err();

            assert!(matches!(err, SettingsError::DurationOutOfRange { .. }));
            assert_eq!(h.engine.settings(), &TimerSettings::default());
            assert_eq!(h.engine.next_deadline(), None);
        }

        #[test]
        fn test_shutdown_drops_pending_settings_write() {
            let mut h = Harness::new(TimerSettings::default());
            let now = Instant::now();
            h.engine
                .update_setting(SettingUpdate::SoundEnabled(false), now)
                .unwrap();
            h.engine.toggle_running(now);
            h.store.clear_write_log();

            h.engine.shutdown();
            h.engine.fire_due(now + AUTOSAVE_INTERVAL);

            assert!(h.store.write_log().is_empty());
            assert_eq!(h.engine.next_deadline(), None);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_run_counts_down_on_virtual_time() {
            let mut h = Harness::new(TimerSettings::default());
            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(TimerCommand::Toggle).unwrap();

            let control = async {
                tokio::time::sleep(TICK_INTERVAL * 5 + TICK_INTERVAL / 2).await;
                tx.send(TimerCommand::Shutdown).unwrap();
            };
            tokio::join!(h.engine.run(rx), control);

            assert_eq!(h.engine.session().remaining_seconds, 1495);
            assert_eq!(h.engine.next_deadline(), None);
        }

        #[tokio::test(start_paused = true)]
        async fn test_run_stops_when_channel_closes() {
            let mut h = Harness::new(TimerSettings::default());
            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(TimerCommand::SwitchMode(TimerMode::ShortBreak)).unwrap();
            drop(tx);

            h.engine.run(rx).await;

            assert_eq!(h.engine.session().mode, TimerMode::ShortBreak);
        }
    }
}
