//! CLI module for the Pomodoro Timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `context`: Store and notification service shared by commands
//! - `display`: Output formatting and display logic
//! - `session`: Interactive timer session

pub mod commands;
pub mod context;
pub mod display;
pub mod session;

pub use commands::{
    Cli, Commands, NotifyArgs, SettingsAction, SettingsArgs, SoundArgs, StartArgs,
};
pub use context::AppContext;
pub use display::Display;
pub use session::{parse_input, run_session, SessionInput, SessionView};
