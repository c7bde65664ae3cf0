// src/commands/packs.rs

//! Recipe pack inspection and singleton coverage

use super::{block_on, load_config};
use anyhow::{Context, Result};
use recipe_engine::pack::{
    ConflictDetector, EnsureReport, FilePackClient, InspectionReport, PackClient,
    ensure_missing_singletons, extract_pack_ids, pack_id_exists,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Pack IDs from the command line followed by those in the environment document
fn collect_pack_ids(ids: &[String], environment: Option<&Path>) -> Result<Vec<String>> {
    let mut all: Vec<String> = Vec::new();
    for id in ids {
        if !pack_id_exists(&all, id) {
            all.push(id.clone());
        }
    }

    if let Some(path) = environment {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read environment {}", path.display()))?;
        let document: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid environment document {}", path.display()))?;

        let properties = document.get("properties").unwrap_or(&document);
        match extract_pack_ids(Some(properties)) {
            Some(env_ids) => {
                for id in env_ids {
                    if !pack_id_exists(&all, &id) {
                        all.push(id);
                    }
                }
            }
            None => info!("Environment {} references no recipe packs", path.display()),
        }
    }

    Ok(all)
}

fn print_inspection(report: &InspectionReport) {
    if report.covered.is_empty() {
        println!("No resource types are covered by the inspected packs.");
    } else {
        println!("Covered resource types ({}):", report.covered.len());
        for (resource_type, pack) in &report.covered {
            println!("  {} -> {}", resource_type, pack);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped pack references:");
        for skipped in &report.skipped {
            println!("  {} ({})", skipped.id, skipped.reason);
        }
    }
}

/// Show which pack provides each resource type
///
/// Fails when any resource type is provided by more than one pack.
pub fn cmd_packs_inspect(
    config_path: Option<&Path>,
    ids: &[String],
    environment: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let pack_ids = collect_pack_ids(ids, environment)?;
    if pack_ids.is_empty() {
        println!("No recipe packs to inspect.");
        return Ok(());
    }

    let client: Arc<dyn PackClient> = Arc::new(FilePackClient::new(&config.packs.store_dir));
    let detector = ConflictDetector::new().with_client(&config.packs.scope, client);

    let report = block_on(detector.inspect(&pack_ids))??;
    print_inspection(&report);

    match report.conflict_error() {
        Some(conflict) => Err(conflict.into()),
        None => Ok(()),
    }
}

/// Inspect, then fill the gaps; refuses to touch a store with conflicts
async fn ensure_coverage(
    detector: &ConflictDetector,
    client: &dyn PackClient,
    scope: &str,
    pack_ids: &[String],
) -> recipe_engine::Result<EnsureReport> {
    let inspection = detector.inspect(pack_ids).await?;
    if let Some(conflict) = inspection.conflict_error() {
        return Err(conflict);
    }
    ensure_missing_singletons(client, scope, &inspection.covered).await
}

/// Create singleton packs for core resource types no referenced pack provides
pub fn cmd_packs_ensure(
    config_path: Option<&Path>,
    ids: &[String],
    environment: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let pack_ids = collect_pack_ids(ids, environment)?;

    let client: Arc<dyn PackClient> = Arc::new(FilePackClient::new(&config.packs.store_dir));
    let detector = ConflictDetector::new().with_client(&config.packs.scope, client.clone());

    let ensured = block_on(ensure_coverage(
        &detector,
        client.as_ref(),
        &config.packs.scope,
        &pack_ids,
    ))??;

    let mut registered = pack_ids;
    for id in ensured.pack_ids() {
        if !pack_id_exists(&registered, &id) {
            registered.push(id);
        }
    }

    if json {
        let document = serde_json::json!({ "recipePacks": registered });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if ensured.created.is_empty() {
        println!("All core resource types already have a recipe.");
    } else {
        println!("Created {} recipe pack(s):", ensured.created.len());
        for id in &ensured.created {
            println!("  {}", id);
        }
    }

    println!("\nRecipe packs for the environment:");
    for id in &registered {
        println!("  {}", id);
    }
    Ok(())
}
