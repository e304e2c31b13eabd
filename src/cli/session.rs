//! Interactive timer session for `pomodoro start`.
//!
//! The engine runs on the current task next to a UI loop that renders
//! engine and notification events and forwards line commands. Lines are
//! read on a plain thread so a pending read never holds up exit.

use std::io::{self, BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::commands::StartArgs;
use super::context::{save_permission, AppContext};
use super::display::Display;
use crate::notification::NotificationEvent;
use crate::timer::{TimerCommand, TimerEngine, TimerEvent};
use crate::types::{SettingUpdate, TimerMode, TimerSession, TimerSettings};

// ============================================================================
// Input
// ============================================================================

/// One parsed line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Command(TimerCommand),
    Help,
    Quit,
    Empty,
}

/// Parses an interactive command line.
pub fn parse_input(line: &str) -> Result<SessionInput, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(SessionInput::Empty);
    };

    let input = match head {
        "p" | "pause" | "resume" | "toggle" => SessionInput::Command(TimerCommand::Toggle),
        "r" | "reset" => SessionInput::Command(TimerCommand::Reset),
        "w" | "s" | "l" => {
            let mode = head.parse::<TimerMode>().map_err(|e| e.to_string())?;
            SessionInput::Command(TimerCommand::SwitchMode(mode))
        }
        "mode" => {
            let name = words.next().ok_or("usage: mode <work|short-break|long-break>")?;
            let mode = name.parse::<TimerMode>().map_err(|e| e.to_string())?;
            SessionInput::Command(TimerCommand::SwitchMode(mode))
        }
        "set" => {
            let (Some(key), Some(value)) = (words.next(), words.next()) else {
                return Err("usage: set <key> <value>".to_string());
            };
            let update = SettingUpdate::parse(key, value).map_err(|e| e.to_string())?;
            SessionInput::Command(TimerCommand::UpdateSetting(update))
        }
        "h" | "help" | "?" => SessionInput::Help,
        "q" | "quit" | "exit" => SessionInput::Quit,
        other => return Err(format!("unknown command '{}' (h for help)", other)),
    };
    Ok(input)
}

// ============================================================================
// SessionView
// ============================================================================

/// Terminal-side copy of the engine state, kept current from [`TimerEvent`]s.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session: TimerSession,
    pub settings: TimerSettings,
}

impl SessionView {
    pub fn new(session: TimerSession, settings: TimerSettings) -> Self {
        Self { session, settings }
    }

    /// Applies `event` the same way the engine applied it.
    pub fn apply(&mut self, event: &TimerEvent) {
        match event {
            TimerEvent::Tick { remaining_seconds } => {
                self.session.remaining_seconds = *remaining_seconds;
            }
            TimerEvent::RunningChanged { running } => self.session.running = *running,
            TimerEvent::ModeChanged { mode, .. } => self.session.enter_mode(*mode, &self.settings),
            TimerEvent::Reset { remaining_seconds } => {
                self.session.running = false;
                self.session.remaining_seconds = *remaining_seconds;
            }
            TimerEvent::SessionCompleted { mode, .. } => {
                if *mode == TimerMode::Work {
                    self.session.completed_work_count += 1;
                }
            }
            TimerEvent::SettingsChanged(settings) => self.settings = settings.clone(),
        }
    }
}

// ============================================================================
// Screen
// ============================================================================

/// Keeps the countdown on the last terminal line with messages above it.
struct Screen;

impl Screen {
    fn redraw(view: &SessionView) {
        let mut out = std::io::stdout().lock();
        let _ = write!(
            out,
            "\r\x1b[2K{}",
            Display::format_timer_line(&view.session, &view.settings)
        );
        let _ = out.flush();
    }

    fn message(view: &SessionView, text: &str) {
        {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "\r\x1b[2K{}", text);
        }
        Self::redraw(view);
    }
}

// ============================================================================
// run_session
// ============================================================================

fn spawn_input_reader() -> Result<mpsc::UnboundedReceiver<io::Result<String>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("could not start the input reader")?;
    Ok(rx)
}

/// Runs an interactive session until the user quits or stdin closes.
pub async fn run_session(context: &AppContext, args: &StartArgs) -> Result<()> {
    if !args.no_prompt {
        context.ensure_permission().await;
    }

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (command_tx, commands) = mpsc::unbounded_channel();
    let mut notes = context.notifier.subscribe();
    let mut lines = spawn_input_reader()?;

    let mut engine = TimerEngine::load(
        context.persistence(),
        std::rc::Rc::clone(&context.notifier),
        event_tx,
    );
    if let Some(mode) = args.mode {
        engine.switch_mode(mode);
    }
    if !args.paused && !engine.session().running {
        engine.toggle_running(Instant::now());
    }
    // Events from the setup above are already reflected in the view.
    while events.try_recv().is_ok() {}

    let mut view = SessionView::new(engine.session().clone(), engine.settings().clone());

    let ui = async {
        Display::show_session_help();
        Screen::redraw(&view);

        let mut notes_open = true;
        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    view.apply(&event);
                    match Display::format_event(&event) {
                        Some(text) => Screen::message(&view, &text),
                        None => Screen::redraw(&view),
                    }
                }
                note = notes.recv(), if notes_open => match note {
                    Ok(NotificationEvent::InAppNotification(request)) => {
                        Screen::message(&view, &Display::format_in_app(&request));
                    }
                    Ok(NotificationEvent::NotificationPermissionChanged { permission }) => {
                        save_permission(context.store.as_ref(), permission);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Skipped {} notification events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => notes_open = false,
                },
                line = lines.recv() => match line {
                    Some(Ok(line)) => match parse_input(&line) {
                        Ok(SessionInput::Command(command)) => {
                            let _ = command_tx.send(command);
                        }
                        Ok(SessionInput::Help) => Display::show_session_help(),
                        Ok(SessionInput::Empty) => Screen::redraw(&view),
                        Ok(SessionInput::Quit) => break,
                        Err(message) => Screen::message(&view, &message),
                    },
                    None => break,
                    Some(Err(e)) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        // Pausing writes the snapshot; shutdown itself never writes.
        if view.session.running {
            let _ = command_tx.send(TimerCommand::Toggle);
        }
        let _ = command_tx.send(TimerCommand::Shutdown);
        println!();
    };

    tokio::join!(engine.run(commands), ui);
    Ok(())
}
