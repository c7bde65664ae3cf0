// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, PacksCommands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Resolve {
            mappings,
            json,
            pack,
            no_prompt,
        } => commands::cmd_resolve(config_path, &mappings, json, pack.as_deref(), no_prompt),

        Commands::Sources => commands::cmd_sources(config_path),

        Commands::Packs(PacksCommands::Inspect { ids, environment }) => {
            commands::cmd_packs_inspect(config_path, &ids, environment.as_deref())
        }

        Commands::Packs(PacksCommands::Ensure {
            ids,
            environment,
            json,
        }) => commands::cmd_packs_ensure(config_path, &ids, environment.as_deref(), json),
    }
}
