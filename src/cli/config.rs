use crate::services::ConfigService;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. embedding.base_url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. classifier.model)
        key: String,

        /// New value
        value: String,
    },
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let config_service = ConfigService::new(&PathBuf::from("."));

    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "photo-insight is not initialized here. Run 'photo-insight init' first."
        ));
    }

    match args.command {
        ConfigCommands::Get { key } => {
            println!("{}", config_service.get(&key)?);
        },
        ConfigCommands::Set { key, value } => {
            config_service.set(&key, value)?;
            println!("Updated {key}");
        },
    }
    Ok(())
}
