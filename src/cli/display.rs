//! Display utilities for the Pomodoro Timer CLI.
//!
//! This module provides formatted output for:
//! - Status and settings display
//! - The live countdown line and session events
//! - In-app notification banners
//! - Error messages

use chrono::{DateTime, Utc};

use crate::notification::{Delivery, DeliveryChannel, NotificationRequest, PermissionState};
use crate::sound::SoundPreset;
use crate::timer::{is_stale, restore_session, TimerEvent};
use crate::types::{format_time, SessionSnapshot, TimerSession, TimerSettings};

/// Width of the progress bar in characters.
const PROGRESS_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Shows the stored session.
    pub fn show_status(
        snapshot: Option<&SessionSnapshot>,
        settings: &TimerSettings,
        now: DateTime<Utc>,
    ) {
        println!("{}", Self::format_status(snapshot, settings, now));
    }

    /// Formats the stored session as it would be resumed at `now`.
    pub fn format_status(
        snapshot: Option<&SessionSnapshot>,
        settings: &TimerSettings,
        now: DateTime<Utc>,
    ) -> String {
        let mut out = String::from("Pomodoro Timer Status\n");
        out.push_str("─────────────────────────────\n");

        let Some(snapshot) = snapshot else {
            out.push_str("No saved session");
            return out;
        };

        let session = restore_session(Some(snapshot.clone()), settings, now);
        out.push_str(&format!("Mode:      {}\n", session.mode.label()));
        out.push_str(&format!(
            "Remaining: {} ({:.0}%)\n",
            session.formatted_remaining(),
            session.progress_percent(settings)
        ));
        out.push_str(&format!("Completed: {}\n", session.completed_work_count));
        out.push_str(&format!("History:   {} sessions\n", session.history.len()));

        let age_minutes = snapshot.age_millis(now).max(0) / 60_000;
        if is_stale(snapshot, now) {
            out.push_str(&format!(
                "Saved:     {} min ago (stale; the next start begins a fresh work session)",
                age_minutes
            ));
        } else {
            out.push_str(&format!("Saved:     {} min ago", age_minutes));
        }
        out
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Shows the current settings.
    pub fn show_settings(settings: &TimerSettings) {
        println!("{}", Self::format_settings(settings));
    }

    pub fn format_settings(settings: &TimerSettings) -> String {
        let on_off = |b: bool| if b { "on" } else { "off" };
        [
            format!("work                  {} min", settings.work_minutes),
            format!("short-break           {} min", settings.short_break_minutes),
            format!("long-break            {} min", settings.long_break_minutes),
            format!("auto-start-breaks     {}", on_off(settings.auto_start_breaks)),
            format!("auto-start-pomodoros  {}", on_off(settings.auto_start_pomodoros)),
            format!("sound                 {}", on_off(settings.sound_enabled)),
            format!("notifications         {}", on_off(settings.notifications_enabled)),
            format!("volume                {}", settings.volume),
        ]
        .join("\n")
    }

    /// Shows a confirmation for a changed setting.
    pub fn show_setting_updated(key: &str) {
        println!("* Updated {}", key);
    }

    // ------------------------------------------------------------------------
    // Live session
    // ------------------------------------------------------------------------

    /// Formats the countdown line, e.g. `[Work] 24:59 ████░░░░ 4% · 2 done`.
    pub fn format_timer_line(session: &TimerSession, settings: &TimerSettings) -> String {
        let percent = session.progress_percent(settings);
        let filled = ((percent / 100.0) * PROGRESS_WIDTH as f64).round() as usize;
        let filled = filled.min(PROGRESS_WIDTH);
        let state = if session.running { "" } else { " (paused)" };
        format!(
            "[{}] {} {}{} {:>3.0}% · {} done{}",
            session.mode.label(),
            session.formatted_remaining(),
            "█".repeat(filled),
            "░".repeat(PROGRESS_WIDTH - filled),
            percent,
            session.completed_work_count,
            state
        )
    }

    /// Formats a timer event worth its own line; ticks return `None`.
    pub fn format_event(event: &TimerEvent) -> Option<String> {
        match event {
            TimerEvent::Tick { .. } | TimerEvent::SettingsChanged(_) => None,
            TimerEvent::RunningChanged { running: true } => Some("> Started".to_string()),
            TimerEvent::RunningChanged { running: false } => Some("|| Paused".to_string()),
            TimerEvent::ModeChanged { mode, auto_start } => Some(if *auto_start {
                format!("-> {} (starting in 1s)", mode.label())
            } else {
                format!("-> {}", mode.label())
            }),
            TimerEvent::Reset { remaining_seconds } => {
                Some(format!("[] Reset to {}", format_time(*remaining_seconds)))
            }
            TimerEvent::SessionCompleted {
                title, description, ..
            } => Some(format!("* {} {}", title, description)),
        }
    }

    /// Shows an in-app notification banner.
    pub fn show_in_app(request: &NotificationRequest) {
        println!("{}", Self::format_in_app(request));
    }

    pub fn format_in_app(request: &NotificationRequest) -> String {
        if request.body().is_empty() {
            format!("[!] {}", request.title)
        } else {
            format!("[!] {}: {}", request.title, request.body())
        }
    }

    /// Shows the interactive command reference.
    pub fn show_session_help() {
        println!("Commands: p pause/resume · r reset · w/s/l switch mode · set <key> <value> · q quit");
    }

    // ------------------------------------------------------------------------
    // Sound / Notification
    // ------------------------------------------------------------------------

    /// Shows the preset registry.
    pub fn show_presets() {
        println!("{}", Self::format_presets());
    }

    pub fn format_presets() -> String {
        SoundPreset::all()
            .iter()
            .map(|p| {
                let repeat = match p.repeat_count() {
                    1 => String::new(),
                    n => format!(" x{}", n),
                };
                format!(
                    "{:<11} {:>5.0} Hz  {:.1}s  {}{}",
                    p.name, p.frequency, p.duration_seconds, p.waveform, repeat
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shows the result of a sound test.
    pub fn show_sound_result(preset: &str, played: bool) {
        if played {
            println!("* Played '{}'", preset);
        } else {
            println!("Could not play '{}'; no audio output available", preset);
        }
    }

    /// Shows where a notification ended up.
    pub fn show_delivery(delivery: &Delivery, permission: PermissionState) {
        println!("{}", Self::format_delivery(delivery, permission));
    }

    pub fn format_delivery(delivery: &Delivery, permission: PermissionState) -> String {
        match delivery.channel {
            DeliveryChannel::System => "* Notification sent".to_string(),
            DeliveryChannel::InApp => {
                format!("Shown in terminal (notification permission: {})", permission)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }
}

// ============================================================================
// Tests
// ============================================================================
