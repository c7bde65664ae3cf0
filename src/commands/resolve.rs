// src/commands/resolve.rs

//! Dependency resolution command

use super::{block_on, cancel_on_interrupt, load_config};
use anyhow::{Context, Result};
use recipe_engine::config::{EngineConfig, PolicyKind};
use recipe_engine::pack::{FilePackClient, PackClient, PackId, RecipeDefinition, RecipePackProperties};
use recipe_engine::selection::ResolutionReport;
use recipe_engine::source::build_registry;
use recipe_engine::{
    DependencyOutcome, Matcher, PriorityResolver, RankingPolicy, ResourceTypeMapping, RulePolicy,
    SelectionCoordinator, SkipReason, TerminalSelector,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolve the dependencies listed in `mappings_path`
///
/// With `pack`, resolved recipes are also written into that pack in the
/// configured scope, ranked under the fixed policy.
pub fn cmd_resolve(
    config_path: Option<&Path>,
    mappings_path: &Path,
    json: bool,
    pack: Option<&str>,
    no_prompt: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let content = std::fs::read_to_string(mappings_path)
        .with_context(|| format!("Failed to read {}", mappings_path.display()))?;
    let mappings: Vec<ResourceTypeMapping> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid dependency mappings in {}", mappings_path.display()))?;

    if mappings.is_empty() {
        println!("No dependencies to resolve.");
        return Ok(());
    }

    block_on(async {
        let coordinator = build_coordinator(&config, pack.is_some(), no_prompt)?;
        let cancel = cancel_on_interrupt();

        let report = coordinator.resolve(&mappings, &cancel).await?;

        if let Some(pack_name) = pack {
            register_into_pack(&config, pack_name, &mappings, &report).await?;
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&mappings, &report);
        }
        Ok::<(), anyhow::Error>(())
    })?
}

fn build_coordinator(
    config: &EngineConfig,
    for_pack: bool,
    no_prompt: bool,
) -> Result<SelectionCoordinator> {
    let (registry, skipped) = build_registry(&config.sources)?;
    for source in &skipped {
        warn!("Recipe source '{}' not available: {}", source.name, source.reason);
    }

    let language = config
        .resolution
        .prefer_language
        .resolve(&config.project_root());
    let provider = config.matcher.cloud_provider;
    let policy = if for_pack {
        RulePolicy::fixed(language, provider)
    } else {
        match config.resolution.policy {
            PolicyKind::Fixed => RulePolicy::fixed(language, provider),
            PolicyKind::Preference => RulePolicy::preference(language, provider),
        }
    };
    info!("Ranking with {} policy, preferred language {}", policy.name(), language);

    let matcher = Matcher::new(Arc::new(registry), config.matcher.options())
        .with_worker_limit(config.matcher.worker_limit)
        .with_source_timeout(config.matcher.source_timeout());

    let mut coordinator = SelectionCoordinator::new(matcher, PriorityResolver::new(Arc::new(policy)))
        .with_auto_resolve(config.resolution.auto_resolve);
    if !no_prompt && let Some(selector) = TerminalSelector::detect() {
        coordinator = coordinator.with_selector(Arc::new(selector));
    }
    Ok(coordinator)
}

/// Merge resolved recipes into a pack, keeping recipes already present for
/// other resource types
async fn register_into_pack(
    config: &EngineConfig,
    pack_name: &str,
    mappings: &[ResourceTypeMapping],
    report: &ResolutionReport,
) -> Result<()> {
    let client = FilePackClient::new(&config.packs.store_dir);
    let mut properties = client
        .get(pack_name)
        .await?
        .unwrap_or_else(RecipePackProperties::new);

    let mut added = 0;
    for mapping in mappings {
        if let Some(recipe) = report
            .outcomes
            .get(&mapping.dependency_id)
            .and_then(DependencyOutcome::recipe)
        {
            properties = properties.with_recipe(
                &mapping.resource_type.name,
                RecipeDefinition::from_recipe(recipe),
            );
            added += 1;
        }
    }

    if added == 0 {
        println!("No resolved recipes to register.");
        return Ok(());
    }

    client.create_or_update(pack_name, &properties).await?;
    println!(
        "Registered {} recipe(s) in pack {}",
        added,
        PackId::new(&config.packs.scope, pack_name)
    );
    Ok(())
}

fn print_report(mappings: &[ResourceTypeMapping], report: &ResolutionReport) {
    let types: HashMap<&str, String> = mappings
        .iter()
        .map(|m| (m.dependency_id.as_str(), m.resource_type.to_string()))
        .collect();
    let summary = report.summary();

    println!(
        "Resolved {} of {} dependencies:",
        summary.resolved,
        report.outcomes.len()
    );
    for (dependency, outcome) in &report.outcomes {
        let resource_type = types.get(dependency.as_str()).map(String::as_str).unwrap_or("?");
        match outcome {
            DependencyOutcome::Resolved { matched, .. } => {
                println!(
                    "  {} ({}): {} [{}, {}%] from {}",
                    dependency,
                    resource_type,
                    matched.recipe.name,
                    matched.recipe.source_kind,
                    matched.score_percent(),
                    matched.source
                );
                println!("      {}", matched.recipe.source_location);
            }
            DependencyOutcome::Skipped { reason } => {
                let why = match reason {
                    SkipReason::Declined => "skipped".to_string(),
                    SkipReason::NoCandidates => "no matching recipe".to_string(),
                    SkipReason::NeedsManualRecipe { candidates } => {
                        format!("needs a manual choice between {}", candidates.join(", "))
                    }
                };
                println!("  {} ({}): {}", dependency, resource_type, why);
            }
        }
    }

    if !summary.failed_sources.is_empty() {
        println!("\nSource failures:");
        for (dependency, sources) in &summary.failed_sources {
            println!("  {}: {}", dependency, sources.join(", "));
        }
    }

    if !summary.unresolved.is_empty() {
        println!("\nWithout a recipe: {}", summary.unresolved.join(", "));
    }
}
