//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::config;
use crate::logging;
use crate::setup;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal microphone recorder with a live bar waveform and synchronized replay
#[derive(Parser)]
#[command(name = "recwave")]
#[command(version)]
#[command(about = "Record the microphone with a live bar waveform, then replay it in sync")]
#[command(long_about = "Record the microphone with a live bar waveform, then replay it in sync.\n\nDEFAULT COMMAND:\n    If no command is specified, 'session' is used by default.\n\nKEYS:\n    r          start or stop recording\n    p, Space   play the recording\n    s          stop\n    q, Esc     quit\n\nEXAMPLES:\n    # Open the recorder\n    $ recwave\n\n    # Toggle recording from a window manager keybinding\n    $ pkill -USR1 recwave\n\n    # Replay the last recording and exit when it ends\n    $ recwave play\n\n    # Pick an input device for audio.device\n    $ recwave list-devices")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/recwave/recwave.toml\n    Recording:          ~/.cache/recwave/recording.wav\n    Logs:               ~/.local/state/recwave/recwave.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the record/play session (default)
    ///
    /// Press r to record, p to play, s to stop and q to quit.
    /// SIGUSR1 toggles recording while the session is open.
    #[command(visible_alias = "s")]
    Session,

    /// Replay the last recording with its waveform
    ///
    /// Plays the saved recording once and exits when it ends.
    #[command(visible_alias = "p")]
    Play,

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in recwave.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   recwave completions bash > recwave.bash
    ///   recwave completions zsh > _recwave
    ///   recwave completions fish > recwave.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the default config cannot be written
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "recwave", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            if let Err(e) = commands::handle_list_devices() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        Some(Commands::Logs) => {
            if let Err(e) = commands::handle_logs() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        _ => {}
    }

    logging::init_logging()?;

    if setup::ensure_config(&config::get_config_path()?)? {
        tracing::info!("Wrote default configuration");
    }

    match cli.command {
        None | Some(Commands::Session) => commands::handle_session().await?,
        Some(Commands::Play) => commands::handle_play().await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
