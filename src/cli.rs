//! Command-line interface for meetscribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Live meeting transcription
#[derive(Parser, Debug)]
#[command(name = "meetscribe", version, about = "Live meeting transcription")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Meeting title used in exports and summaries
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Participant names, comma separated
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub participants: Vec<String>,

    /// Attribute text to speakers using the service's diarization tags
    #[arg(long)]
    pub diarize: bool,

    /// Audio input device (see `meetscribe devices`)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Language code for transcription (default: auto-detect)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Number of transcription workers
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Stop automatically after this long. Examples: 90s, 30m, 1h30m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_duration: Option<Duration>,

    /// Write the transcript as JSONL to this path on stop
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Request a summary from the summarization service after stopping
    #[arg(long)]
    pub summarize: bool,
}

/// Parse a duration string.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// Inspect configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_cli_parses_record_flags() {
        let cli = Cli::parse_from([
            "meetscribe",
            "--title",
            "Standup",
            "--participants",
            "Ana,Ben",
            "--diarize",
            "--workers",
            "2",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.title.as_deref(), Some("Standup"));
        assert_eq!(cli.participants, vec!["Ana", "Ben"]);
        assert!(cli.diarize);
        assert_eq!(cli.workers, Some(2));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["meetscribe", "devices"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));

        let cli = Cli::parse_from(["meetscribe", "config", "path"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Path
            })
        ));
    }
}
