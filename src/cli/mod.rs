// src/cli/mod.rs
//! CLI definitions for the recipe engine
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `resolve` - Resolve dependencies to recipes
//! - `sources` - Show configured recipe sources
//! - `packs` - Inspect recipe packs and ensure core coverage

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod packs;

pub use packs::PacksCommands;

#[derive(Parser)]
#[command(name = "recipe-engine")]
#[command(version)]
#[command(about = "Resolve infrastructure dependencies to provisioning recipes", long_about = None)]
pub struct Cli {
    /// Path to the engine configuration file (default: ./recipe-engine.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies to recipes
    ///
    /// Reads a JSON array of {"dependencyId", "resourceType": {"name", "apiVersion"}}
    /// objects and prints the chosen recipe for each dependency.
    Resolve {
        /// Path to the dependency mappings file
        mappings: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Register resolved recipes into a pack (default name: local-dev)
        #[arg(long, num_args = 0..=1, default_missing_value = "local-dev")]
        pack: Option<String>,

        /// Never prompt, even on a terminal
        #[arg(long)]
        no_prompt: bool,
    },

    /// Show configured recipe sources and whether they could be built
    Sources,

    /// Recipe pack commands
    #[command(subcommand)]
    Packs(PacksCommands),
}
