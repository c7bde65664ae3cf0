// src/source/registry.rs

//! Ordered, name-unique registry of recipe sources
//!
//! Registration order is the final tie-break between otherwise equal
//! candidates, so the registry is built once during setup and treated as
//! read-only while matching.

use super::RecipeSource;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// A source that was configured but could not be constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub name: String,
    pub reason: String,
}

/// Outcome of registering a possibly-failed source construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered,
    Skipped(SkippedSource),
}

/// Registry of recipe sources in registration order
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn RecipeSource>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source, rejecting duplicate names
    pub fn register(&mut self, source: Arc<dyn RecipeSource>) -> Result<()> {
        if self.get(source.name()).is_some() {
            return Err(Error::DuplicateSourceName(source.name().to_string()));
        }
        debug!(
            "Registered recipe source '{}' ({}) at position {}",
            source.name(),
            source.kind(),
            self.sources.len()
        );
        self.sources.push(source);
        Ok(())
    }

    /// Register the result of constructing a source
    ///
    /// A construction error does not abort setup: it is logged and returned
    /// as [`Registration::Skipped`] so callers can surface it.
    pub fn register_built(
        &mut self,
        name: &str,
        built: Result<Arc<dyn RecipeSource>>,
    ) -> Result<Registration> {
        match built {
            Ok(source) => {
                self.register(source)?;
                Ok(Registration::Registered)
            }
            Err(e) => {
                warn!("Skipping recipe source '{}': {}", name, e);
                Ok(Registration::Skipped(SkippedSource {
                    name: name.to_string(),
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// All sources in registration order
    pub fn all(&self) -> &[Arc<dyn RecipeSource>] {
        &self.sources
    }

    /// Look up a source by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn RecipeSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// Registration position of the named source
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.name() == name)
    }

    /// Source names in registration order
    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Tie-break order: preferred sources first (in the given order), then
    /// the rest in registration order
    ///
    /// Returns, for each registered source index, its effective position.
    /// Unknown names in `preferred` are ignored.
    pub fn effective_order(&self, preferred: &[String]) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::with_capacity(self.sources.len());
        for name in preferred {
            if let Some(idx) = self.position(name)
                && !order.contains(&idx)
            {
                order.push(idx);
            }
        }
        for idx in 0..self.sources.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }

        let mut positions = vec![0; self.sources.len()];
        for (position, idx) in order.into_iter().enumerate() {
            positions[idx] = position;
        }
        positions
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
