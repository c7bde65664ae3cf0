// src/commands/sources.rs

//! Recipe source listing

use super::load_config;
use anyhow::Result;
use recipe_engine::config::{SourceConfig, SourceType};
use recipe_engine::source::build_registry;
use std::path::Path;

/// Show configured sources in registration order
pub fn cmd_sources(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let (registry, skipped) = build_registry(&config.sources)?;

    if config.sources.is_empty() {
        println!("No recipe sources configured.");
        return Ok(());
    }

    println!("Recipe sources ({} registered):", registry.len());
    for source in &config.sources {
        let status = match skipped.iter().find(|s| s.name == source.name) {
            Some(skip) => format!("unavailable: {}", skip.reason),
            None => match registry.position(&source.name) {
                Some(position) => format!("position {}", position),
                None => "not registered".to_string(),
            },
        };
        println!("  {} [{}] {} ({})", source.name, source.kind, describe(source), status);
    }

    if !config.matcher.preferred_sources.is_empty() {
        println!("\nPreferred on ties: {}", config.matcher.preferred_sources.join(", "));
    }

    Ok(())
}

fn describe(source: &SourceConfig) -> String {
    match source.kind {
        SourceType::Local => source
            .path
            .as_deref()
            .unwrap_or(Path::new("."))
            .display()
            .to_string(),
        SourceType::Catalog => {
            let provider = source
                .provider
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            if source.offline {
                format!("{} (built-in table)", provider)
            } else {
                match &source.url {
                    Some(url) => format!("{} via {}", provider, url),
                    None => provider,
                }
            }
        }
        SourceType::Generated if source.fallback => "pattern library with fallback".to_string(),
        SourceType::Generated => "pattern library".to_string(),
    }
}
