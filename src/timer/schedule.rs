//! Pending delayed work of the timer engine.
//!
//! Each kind of delayed work has at most one armed deadline. Cancelling is
//! clearing the slot; the engine's run loop sleeps until the earliest armed
//! deadline and then takes every deadline that is due.

use tokio::time::{Duration, Instant};

/// Delay between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Delay before a completion transition starts the next interval.
pub const AUTO_START_DELAY: Duration = Duration::from_secs(1);

/// Interval between snapshot writes while running.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Quiet period before changed settings are written.
pub const SETTINGS_DEBOUNCE: Duration = Duration::from_secs(1);

/// Kinds of delayed work, in the order they run when due together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    AutoStart,
    Tick,
    AutoSave,
    SettingsFlush,
}

impl Deadline {
    const ALL: [Deadline; 4] = [
        Deadline::AutoStart,
        Deadline::Tick,
        Deadline::AutoSave,
        Deadline::SettingsFlush,
    ];

    fn index(self) -> usize {
        match self {
            Deadline::AutoStart => 0,
            Deadline::Tick => 1,
            Deadline::AutoSave => 2,
            Deadline::SettingsFlush => 3,
        }
    }
}

/// One slot per [`Deadline`] kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    slots: [Option<Instant>; 4],
}

impl Schedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `deadline` to fire at `at`, replacing any earlier arming.
    pub fn arm(&mut self, deadline: Deadline, at: Instant) {
        self.slots[deadline.index()] = Some(at);
    }

    pub fn cancel(&mut self, deadline: Deadline) {
        self.slots[deadline.index()] = None;
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; 4];
    }

    pub fn is_armed(&self, deadline: Deadline) -> bool {
        self.slots[deadline.index()].is_some()
    }

    /// Returns when `deadline` fires, if armed.
    pub fn when(&self, deadline: Deadline) -> Option<Instant> {
        self.slots[deadline.index()]
    }

    /// Returns the earliest armed deadline.
    pub fn next(&self) -> Option<Instant> {
        self.slots.iter().flatten().min().copied()
    }

    /// Disarms and returns a deadline that is due at `now`.
    ///
    /// When several are due, the earliest wins; ties follow [`Deadline`]
    /// declaration order.
    pub fn take_due(&mut self, now: Instant) -> Option<Deadline> {
        let due = Deadline::ALL
            .into_iter()
            .filter_map(|d| self.when(d).filter(|at| *at <= now).map(|at| (at, d)))
            .min_by_key(|(at, d)| (*at, d.index()))
            .map(|(_, d)| d)?;
        self.cancel(due);
        Some(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_schedule() {
        let mut schedule = Schedule::new();
        assert_eq!(schedule.next(), None);
        assert_eq!(schedule.take_due(Instant::now()), None);
    }

    #[test]
    fn test_arm_and_cancel() {
        let now = Instant::now();
        let mut schedule = Schedule::new();

        schedule.arm(Deadline::Tick, now + TICK_INTERVAL);
        assert!(schedule.is_armed(Deadline::Tick));
        assert_eq!(schedule.next(), Some(now + TICK_INTERVAL));

        schedule.cancel(Deadline::Tick);
        assert!(!schedule.is_armed(Deadline::Tick));
        assert_eq!(schedule.next(), None);
    }

    #[test]
    fn test_rearm_replaces() {
        let now = Instant::now();
        let mut schedule = Schedule::new();

        schedule.arm(Deadline::SettingsFlush, now + Duration::from_millis(300));
        schedule.arm(Deadline::SettingsFlush, now + SETTINGS_DEBOUNCE);

        assert_eq!(schedule.when(Deadline::SettingsFlush), Some(now + SETTINGS_DEBOUNCE));
    }

    #[test]
    fn test_next_is_earliest() {
        let now = Instant::now();
        let mut schedule = Schedule::new();
        schedule.arm(Deadline::AutoSave, now + AUTOSAVE_INTERVAL);
        schedule.arm(Deadline::Tick, now + TICK_INTERVAL);

        assert_eq!(schedule.next(), Some(now + TICK_INTERVAL));
    }

    #[test]
    fn test_take_due_only_returns_due() {
        let now = Instant::now();
        let mut schedule = Schedule::new();
        schedule.arm(Deadline::Tick, now + TICK_INTERVAL);
        schedule.arm(Deadline::AutoSave, now + AUTOSAVE_INTERVAL);

        assert_eq!(schedule.take_due(now), None);
        assert_eq!(schedule.take_due(now + TICK_INTERVAL), Some(Deadline::Tick));
        assert_eq!(schedule.take_due(now + TICK_INTERVAL), None);
        assert!(schedule.is_armed(Deadline::AutoSave));
    }

    #[test]
    fn test_take_due_tie_order() {
        let now = Instant::now();
        let at = now + Duration::from_secs(10);
        let mut schedule = Schedule::new();
        schedule.arm(Deadline::SettingsFlush, at);
        schedule.arm(Deadline::AutoSave, at);
        schedule.arm(Deadline::Tick, at);

        assert_eq!(schedule.take_due(at), Some(Deadline::Tick));
        assert_eq!(schedule.take_due(at), Some(Deadline::AutoSave));
        assert_eq!(schedule.take_due(at), Some(Deadline::SettingsFlush));
        assert_eq!(schedule.take_due(at), None);
    }

    #[test]
    fn test_cancel_all() {
        let now = Instant::now();
        let mut schedule = Schedule::new();
        schedule.arm(Deadline::Tick, now);
        schedule.arm(Deadline::AutoStart, now);

        schedule.cancel_all();

        assert_eq!(schedule.next(), None);
    }
}
