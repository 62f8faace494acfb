//! Configuration file inspection and creation.

use clap::{Args, Subcommand};
use fmsynth_config::{SynthConfig, default_config_path};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the default configuration file location
    Path,

    /// Write the default configuration (to --config, or the default location)
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            let config = SynthConfig::load_or_default(config_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Path => {
            println!("{}", default_config_path().display());
        }
        ConfigCommand::Init { force } => {
            let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            SynthConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
