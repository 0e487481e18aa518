use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use parley::app::run_conversation;
use parley::audio::capture::{DeviceKind, list_devices};
use parley::cli::{Cli, Commands};
use parley::config::Config;
use parley::error::ParleyError;
use parley::llm::catalog::model_ids;
use parley::llm::family::ModelFamily;
use parley::pipeline::types::ExitReason;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(&cli)?;
            let quiet = cli.quiet;
            let verbose = cli.verbose;
            let handle = tokio::runtime::Handle::current();

            let result =
                tokio::task::spawn_blocking(move || run_conversation(config, quiet, verbose, handle))
                    .await?;

            match result {
                Ok(ExitReason::Farewell) => {}
                Ok(ExitReason::RecognitionClosed) => {
                    eprintln!("{}", "Recognition stream closed.".yellow());
                }
                Ok(ExitReason::CaptureFailed) => {
                    eprintln!("{}", "Microphone stopped delivering audio.".red());
                    std::process::exit(1);
                }
                Err(
                    e @ (ParleyError::UnknownModel { .. }
                    | ParleyError::UnknownProvider { .. }
                    | ParleyError::ConfigInvalidValue { .. }),
                ) => {
                    // Rejected configuration is a usage problem, not a crash.
                    println!("{e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some(Commands::Models) => {
            list_models();
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "parley", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults, then apply overrides.
///
/// Priority order (highest first):
/// 1. Command-line flags
/// 2. Environment variables
/// 3. Custom config path from CLI (--config), or ~/.config/parley/config.toml
/// 4. Built-in defaults
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    }
    .with_env_overrides();

    if let Some(model) = &cli.model {
        config.model.model_id = model.clone();
    }
    if let Some(region) = &cli.region {
        config.model.region = region.clone();
    }
    if let Some(device) = &cli.device {
        config.audio.input_device = Some(device.clone());
    }
    if let Some(device) = &cli.output_device {
        config.audio.output_device = Some(device.clone());
    }
    Ok(config)
}

fn list_models() {
    println!("Supported models:");
    for model_id in model_ids() {
        let family = ModelFamily::from_model_id(model_id)
            .map(|family| family.as_str())
            .unwrap_or("unknown");
        println!("  {:<34} {}", model_id, family.dimmed());
    }
}

/// List available audio input and output devices.
fn list_audio_devices() -> Result<()> {
    for (kind, label) in [(DeviceKind::Input, "input"), (DeviceKind::Output, "output")] {
        let devices = list_devices(kind)?;
        if devices.is_empty() {
            println!("No audio {label} devices found");
            continue;
        }
        println!("Available audio {label} devices:");
        for (idx, device) in devices.iter().enumerate() {
            println!("  [{}] {}", idx, device);
        }
    }
    Ok(())
}
