// src/cli/packs.rs
//! Recipe pack commands

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum PacksCommands {
    /// Show which pack provides each resource type and report conflicts
    ///
    /// Pack IDs use the form <scope>/providers/Radius.Core/recipePacks/<name>
    Inspect {
        /// Pack IDs to inspect
        ids: Vec<String>,

        /// Environment document whose properties.recipePacks lists pack IDs
        #[arg(short, long)]
        environment: Option<PathBuf>,
    },

    /// Create built-in packs for core resource types no pack provides
    Ensure {
        /// Pack IDs already registered
        ids: Vec<String>,

        /// Environment document whose properties.recipePacks lists pack IDs
        #[arg(short, long)]
        environment: Option<PathBuf>,

        /// Print the resulting pack list as JSON
        #[arg(long)]
        json: bool,
    },
}
