// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use recipe_engine::pack::{RecipeDefinition, RecipeKind, RecipePackProperties};
use recipe_engine::{
    Candidate, Error, MatcherOptions, QueryContext, Recipe, RecipeSource, ResourceType,
    ResourceTypeMapping, Result, Selector, SourceKind, SourceRegistry,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_VERSION: &str = "2025-08-01-preview";
pub const REDIS: &str = "Radius.Data/redisCaches";
pub const POSTGRES: &str = "Radius.Data/postgreSqlDatabases";
pub const RABBITMQ: &str = "Radius.Messaging/rabbitMQQueues";

pub fn mapping(dependency_id: &str, resource_type: &str) -> ResourceTypeMapping {
    ResourceTypeMapping::new(dependency_id, ResourceType::new(resource_type, API_VERSION))
}

/// Source answering from a fixed table, optionally after a delay
pub struct StaticSource {
    name: String,
    kind: SourceKind,
    offers: HashMap<String, Vec<(String, String, f64)>>,
    unreachable: Vec<String>,
    delay: Duration,
}

impl StaticSource {
    pub fn new(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            offers: HashMap::new(),
            unreachable: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    /// Offer a recipe for a resource type
    pub fn offer(mut self, resource_type: &str, recipe: &str, location: &str, confidence: f64) -> Self {
        self.offers
            .entry(resource_type.to_string())
            .or_default()
            .push((recipe.to_string(), location.to_string(), confidence));
        self
    }

    /// Fail every query for a resource type
    pub fn unreachable_for(mut self, resource_type: &str) -> Self {
        self.unreachable.push(resource_type.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RecipeSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn query(&self, ctx: &QueryContext, mapping: &ResourceTypeMapping) -> Result<Vec<Candidate>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        ctx.check_canceled()?;
        if self.unreachable.contains(&mapping.resource_type.name) {
            return Err(Error::source_unavailable(&self.name, "backend unreachable"));
        }

        Ok(self
            .offers
            .get(&mapping.resource_type.name)
            .map(|offers| {
                offers
                    .iter()
                    .map(|(name, location, confidence)| {
                        Candidate::new(
                            Recipe::new(name, self.kind, location),
                            *confidence,
                            format!("listed by {}", self.name),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Source whose backing system is always unreachable
pub struct FailingSource {
    name: String,
}

impl FailingSource {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[async_trait]
impl RecipeSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Catalog(recipe_engine::CloudProvider::Aws)
    }

    async fn query(&self, _: &QueryContext, _: &ResourceTypeMapping) -> Result<Vec<Candidate>> {
        Err(Error::source_unavailable(&self.name, "connection refused"))
    }
}

/// Source that never answers unless canceled
pub struct HangingSource {
    name: String,
}

impl HangingSource {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[async_trait]
impl RecipeSource for HangingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Unknown
    }

    async fn query(&self, ctx: &QueryContext, _: &ResourceTypeMapping) -> Result<Vec<Candidate>> {
        tokio::select! {
            _ = ctx.cancel.cancelled() => Err(Error::Canceled),
            _ = tokio::time::sleep(Duration::from_secs(600)) => Ok(Vec::new()),
        }
    }
}

pub fn registry(sources: Vec<Arc<dyn RecipeSource>>) -> Arc<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    for source in sources {
        registry.register(source).unwrap();
    }
    Arc::new(registry)
}

pub fn options(min_confidence: f64, max_matches: usize) -> MatcherOptions {
    MatcherOptions {
        min_confidence,
        max_matches,
        ..MatcherOptions::default()
    }
}

/// Selector answering from a script of option indexes
///
/// Indexes past the end of the options pick the last (skip) option.
pub struct ScriptedSelector {
    answers: Mutex<Vec<usize>>,
    pub prompts: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedSelector {
    pub fn new(answers: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().rev().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Selector for ScriptedSelector {
    async fn choose(&self, prompt: &str, options: &[String]) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.to_vec()));
        let pick = self
            .answers
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| Error::SelectorError("script exhausted".to_string()))?;
        Ok(options[pick.min(options.len() - 1)].clone())
    }
}

/// Pack providing a Bicep recipe for each of `types`
pub fn pack_with(types: &[&str]) -> RecipePackProperties {
    types.iter().fold(RecipePackProperties::new(), |pack, resource_type| {
        pack.with_recipe(
            resource_type,
            RecipeDefinition::new(RecipeKind::Bicep, format!("ghcr.io/test/{resource_type}")),
        )
    })
}
