//! fmsynth CLI - play, render and inspect the FM synthesizer.

mod commands;
mod sequence;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fmsynth")]
#[command(author, version, about = "Polyphonic fixed-point FM synthesizer", long_about = None)]
struct Cli {
    /// Configuration file (default: the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "fmsynth_synth=trace" (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a note sequence through the audio output
    Play(commands::play::PlayArgs),

    /// Render a note sequence to a WAV file
    Render(commands::render::RenderArgs),

    /// List patch parameters
    Params(commands::params::ParamsArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Show or create the configuration file
    Config(commands::config::ConfigArgs),
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };
    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Play(args) => commands::play::run(args, config),
        Commands::Render(args) => commands::render::run(args, config),
        Commands::Params(args) => commands::params::run(args),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args, config),
    }
}
