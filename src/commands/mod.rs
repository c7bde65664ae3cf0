// src/commands/mod.rs
//! Command handlers for the recipe engine CLI

mod packs;
mod resolve;
mod sources;

pub use packs::{cmd_packs_ensure, cmd_packs_inspect};
pub use resolve::cmd_resolve;
pub use sources::cmd_sources;

use anyhow::{Context, Result};
use recipe_engine::EngineConfig;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration file picked up from the working directory
const DEFAULT_CONFIG_FILE: &str = "recipe-engine.toml";

/// Load the engine configuration
///
/// Without an explicit path, `./recipe-engine.toml` is used if it exists and
/// the built-in defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
        None => {
            debug!("No configuration file, using defaults");
            return Ok(EngineConfig::default());
        }
    };

    EngineConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Drive `future` to completion on a fresh runtime
///
/// Blocking tasks still running afterwards, such as a terminal prompt left
/// unanswered after Ctrl-C, are abandoned rather than joined.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = runtime()?;
    let output = rt.block_on(future);
    rt.shutdown_background();
    Ok(output)
}

/// Token canceled on Ctrl-C; must be called inside the runtime
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling");
            trigger.cancel();
        }
    });
    token
}
