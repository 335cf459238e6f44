use anyhow::Result;
use clap::Parser;
use meetscribe::app::{run_devices, run_record};
use meetscribe::cli::{Cli, Commands, ConfigAction};
use meetscribe::config::Config;
use std::path::Path;

fn main() -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    meetscribe::audio::capture::suppress_audio_warnings();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        None => run_record(config, &cli),
        Some(Commands::Devices) => run_devices(),
        Some(Commands::Config { action }) => handle_config_command(action, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    Ok(config.with_env_overrides())
}

fn handle_config_command(action: &ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Path => {
            match Config::default_path() {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("No configuration directory available."),
            }
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}
