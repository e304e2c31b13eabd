//! Pomodoro Timer CLI
//!
//! This tool helps you stay focused using the Pomodoro Technique:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after 4 pomodoros

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};

use pomodoro::cli::{
    run_session, AppContext, Cli, Commands, Display, NotifyArgs, SettingsAction, SettingsArgs,
    SoundArgs,
};
use pomodoro::sound::SoundPreset;
use pomodoro::types::{SettingUpdate, TimerSettings};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir;
    let open = || AppContext::open(data_dir.clone());

    match cli.command {
        Some(Commands::Start(args)) => run_session(&open()?, &args).await?,
        Some(Commands::Status) => {
            let persistence = open()?.persistence();
            let settings = persistence.load_settings();
            Display::show_status(persistence.load_snapshot().as_ref(), &settings, Utc::now());
        }
        Some(Commands::Settings(args)) => settings(&open()?, args)?,
        Some(Commands::Sound(args)) => sound(&open()?, &args),
        Some(Commands::Notify(args)) => notify(&open()?, &args).await,
        Some(Commands::Completions { shell }) => generate_completions(shell),
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Shows or changes the stored settings.
fn settings(context: &AppContext, args: SettingsArgs) -> Result<()> {
    let persistence = context.persistence();
    let mut settings = persistence.load_settings();

    match args.action {
        None => {}
        Some(SettingsAction::Set { key, value }) => {
            let update = SettingUpdate::parse(&key, &value)
                .map_err(|e| anyhow::anyhow!("{} ({})", e, e.suggestion()))?;
            settings
                .apply(update)
                .with_context(|| format!("could not set {}", key))?;
            persistence
                .save_settings(&settings)
                .context("failed to save settings")?;
            Display::show_setting_updated(update.key());
        }
        Some(SettingsAction::Reset) => {
            settings = TimerSettings::default();
            persistence
                .save_settings(&settings)
                .context("failed to save settings")?;
            println!("* Settings restored to defaults");
        }
    }

    Display::show_settings(&settings);
    Ok(())
}

/// Plays a preset, or lists them.
fn sound(context: &AppContext, args: &SoundArgs) {
    if args.list {
        Display::show_presets();
        return;
    }

    let volume = args
        .volume
        .unwrap_or_else(|| u32::from(context.persistence().load_settings().volume));
    let played = context.notifier.play_sound(&args.preset, volume);
    Display::show_sound_result(&args.preset, played);

    if played {
        wait_for_tone(&args.preset);
    }
}

/// Detached playback stops with the process; let the tone finish first.
fn wait_for_tone(preset: &str) {
    std::thread::sleep(SoundPreset::resolve(preset).total_duration());
}

/// Sends a test notification.
async fn notify(context: &AppContext, args: &NotifyArgs) {
    if args.request_permission {
        context.ensure_permission().await;
    }

    let volume = u32::from(context.persistence().load_settings().volume);
    let delivery = context
        .notifier
        .show_notification(&args.title, &args.body, &args.preset, volume);

    if let Some(request) = context.notifier.last_in_app() {
        Display::show_in_app(&request);
    }
    Display::show_delivery(&delivery, context.notifier.permission());

    if delivery.sound_played == Some(true) {
        wait_for_tone(&args.preset);
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["pomodoro"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["pomodoro", "status"]);
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["pomodoro", "--verbose", "status"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
