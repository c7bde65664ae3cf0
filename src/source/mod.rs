// src/source/mod.rs

//! Recipe sources
//!
//! A source answers one question: which recipes could provision this
//! resource type? Three variants ship with the engine:
//! - [`LocalScanSource`]: infrastructure files already in the project
//! - [`CatalogSource`]: a curated catalog for one target platform
//! - [`GeneratedSource`]: the built-in pattern library
//!
//! Sources may perform I/O but never mutate engine state. A failing source
//! reports [`Error::SourceUnavailable`] and the matcher treats it as having
//! no candidates.

mod catalog;
mod generated;
mod local;
mod registry;

pub use catalog::{
    CatalogEntry, CatalogIndex, CatalogSource, HttpCatalogIndex, StaticCatalogIndex,
    DEFAULT_CATALOG_API, DEFAULT_CATALOG_RAW,
};
pub use generated::{AvmModule, GeneratedSource, PatternGenerator, PatternLibrary, RecipeGenerator};
pub use local::{LocalScanSource, RecipeIndex, RecipeIndexEntry};
pub use registry::{Registration, SkippedSource, SourceRegistry};

use crate::config::{SourceConfig, SourceType};
use crate::error::{Error, Result};
use crate::types::{CloudProvider, Recipe, ResourceTypeMapping, SourceKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A candidate recipe together with the evidence supporting it
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub recipe: Recipe,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Human-readable reasons, never empty
    pub reasons: Vec<String>,
}

impl Candidate {
    pub fn new(recipe: Recipe, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            recipe,
            confidence: confidence.clamp(0.0, 1.0),
            reasons: vec![reason.into()],
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Per-call context handed to every source query
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Fired when the whole run is canceled or the source's deadline elapses
    pub cancel: CancellationToken,
    /// Platform of the target environment
    pub cloud_provider: CloudProvider,
}

impl QueryContext {
    pub fn new(cancel: CancellationToken, cloud_provider: CloudProvider) -> Self {
        Self {
            cancel,
            cloud_provider,
        }
    }

    /// Fail fast if the run has been canceled
    pub fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        Ok(())
    }
}

/// Capability implemented by every recipe provider
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Stable identifier referenced by preferred-source lists
    fn name(&self) -> &str;

    /// Kind of recipes this source produces
    fn kind(&self) -> SourceKind;

    /// Return zero or more candidates for the requested resource type
    async fn query(
        &self,
        ctx: &QueryContext,
        mapping: &ResourceTypeMapping,
    ) -> Result<Vec<Candidate>>;
}

/// Construct a source from its configuration entry
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn RecipeSource>> {
    match config.kind {
        SourceType::Local => {
            let root = config.path.clone().unwrap_or_else(|| ".".into());
            Ok(Arc::new(LocalScanSource::new(&config.name, root)?))
        }
        SourceType::Catalog => {
            let provider = config.provider.ok_or_else(|| {
                Error::ConfigError(format!("catalog source '{}' requires a provider", config.name))
            })?;
            let index: Arc<dyn CatalogIndex> = if config.offline {
                Arc::new(StaticCatalogIndex::with_builtins())
            } else {
                let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(30_000));
                let (api_base, raw_base) = catalog_bases(config);
                Arc::new(HttpCatalogIndex::new(api_base, raw_base, timeout)?)
            };
            Ok(Arc::new(CatalogSource::new(&config.name, provider, index)))
        }
        SourceType::Generated => {
            let mut library = PatternLibrary::builtin();
            if config.fallback {
                library = library.with_fallback(PatternGenerator::derived());
            }
            Ok(Arc::new(GeneratedSource::new(&config.name, library)))
        }
    }
}

/// Contents API and template download bases for a catalog entry
fn catalog_bases(config: &SourceConfig) -> (&str, &str) {
    (
        config.url.as_deref().unwrap_or(DEFAULT_CATALOG_API),
        config.raw_url.as_deref().unwrap_or(DEFAULT_CATALOG_RAW),
    )
}

/// Build a registry from configuration, in list order
///
/// Sources that fail to construct are skipped with a warning and reported
/// back to the caller. Duplicate names are fatal.
pub fn build_registry(configs: &[SourceConfig]) -> Result<(SourceRegistry, Vec<SkippedSource>)> {
    let mut registry = SourceRegistry::new();
    let mut skipped = Vec::new();

    for config in configs {
        match registry.register_built(&config.name, build_source(config))? {
            Registration::Registered => {}
            Registration::Skipped(source) => skipped.push(source),
        }
    }

    if registry.is_empty() && !configs.is_empty() {
        warn!("No configured recipe source could be constructed");
    }

    Ok((registry, skipped))
}
