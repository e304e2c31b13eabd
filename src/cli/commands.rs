//! Command definitions for the Pomodoro Timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::TimerMode;

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro Timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro",
    version,
    about = "Pomodoro timer for the terminal",
    long_about = "A terminal Pomodoro timer with desktop notifications and synthesized alert tones.\n\
                  Sessions and settings persist between runs.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for the stored session and settings
    #[arg(long, global = true, value_name = "PATH", env = "POMODORO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an interactive timer session
    Start(StartArgs),

    /// Show the stored session
    Status,

    /// Show or change settings
    Settings(SettingsArgs),

    /// Play an alert tone
    Sound(SoundArgs),

    /// Send a test notification
    Notify(NotifyArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Switch to this mode before starting (work, short-break, long-break)
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<TimerMode>,

    /// Load the session without starting the countdown
    #[arg(long)]
    pub paused: bool,

    /// Do not ask for notification permission
    #[arg(long)]
    pub no_prompt: bool,
}

/// Arguments for the settings command
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: Option<SettingsAction>,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Change one setting (e.g. `set work 50`, `set sound off`)
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Restore the default settings
    Reset,
}

/// Arguments for the sound command
#[derive(Args, Debug, Clone)]
pub struct SoundArgs {
    /// Preset name; unknown names play the default tone
    #[arg(default_value = "default")]
    pub preset: String,

    /// Volume (0-100); defaults to the configured volume
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub volume: Option<u32>,

    /// List the available presets
    #[arg(long)]
    pub list: bool,
}

/// Arguments for the notify command
#[derive(Args, Debug, Clone)]
pub struct NotifyArgs {
    /// Notification title
    #[arg(value_parser = validate_title)]
    pub title: String,

    /// Notification body
    #[arg(short, long, default_value = "")]
    pub body: String,

    /// Sound preset played with the notification
    #[arg(long, default_value = "default")]
    pub preset: String,

    /// Ask for notification permission if not yet decided
    #[arg(long)]
    pub request_permission: bool,
}

// ============================================================================
// Validation Functions
// ============================================================================

fn parse_mode(s: &str) -> Result<TimerMode, String> {
    s.parse::<TimerMode>().map_err(|e| e.to_string())
}

/// Validates the notification title.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_title(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    if s.chars().count() > 100 {
        return Err("title must be at most 100 characters".to_string());
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================
