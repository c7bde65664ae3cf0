// src/matcher.rs

//! Candidate matching across all registered sources
//!
//! For every requested resource type the matcher fans out to every source
//! concurrently, then fans in on a single task: candidates below the
//! confidence threshold are dropped, the rest are sorted by confidence and
//! tie-break position and capped. Completion order of the source queries
//! never leaks into the result.
//!
//! Resource types are processed concurrently too, bounded by a worker limit,
//! but results are reported in input order.

use crate::error::{Error, Result};
use crate::source::{Candidate, QueryContext, RecipeSource, SourceRegistry};
use crate::types::{MatcherOptions, RecipeMatch, ResourceTypeMapping};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of resource types matched concurrently
pub const DEFAULT_WORKER_LIMIT: usize = 4;

/// Default per-source query deadline
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// A source that produced no candidates because it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source: String,
    pub dependency_id: String,
    pub resource_type: String,
    pub reason: String,
}

/// Outcome of matching a batch of resource types
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// Matches for every dependency, in input order, best first
    pub matches: Vec<RecipeMatch>,
    /// Sources that failed, per dependency
    pub failures: Vec<SourceFailure>,
}

impl MatchReport {
    /// Matches for one dependency, best first
    pub fn for_dependency<'a>(&'a self, dependency_id: &'a str) -> impl Iterator<Item = &'a RecipeMatch> + 'a {
        self.matches
            .iter()
            .filter(move |m| m.dependency_id == dependency_id)
    }

    /// Matches grouped by dependency
    pub fn grouped(&self) -> BTreeMap<String, Vec<RecipeMatch>> {
        let mut grouped: BTreeMap<String, Vec<RecipeMatch>> = BTreeMap::new();
        for m in &self.matches {
            grouped.entry(m.dependency_id.clone()).or_default().push(m.clone());
        }
        grouped
    }
}

/// Per-mapping fan-in accumulator entry
struct Tagged {
    position: usize,
    order: usize,
    source: String,
    candidate: Candidate,
}

/// Queries the registry and applies [`MatcherOptions`]
pub struct Matcher {
    registry: Arc<SourceRegistry>,
    options: MatcherOptions,
    worker_limit: usize,
    source_timeout: Duration,
}

impl Matcher {
    pub fn new(registry: Arc<SourceRegistry>, options: MatcherOptions) -> Self {
        let mut options = options;
        options.max_matches = options.max_matches.max(1);
        options.min_confidence = options.min_confidence.clamp(0.0, 1.0);

        Self {
            registry,
            options,
            worker_limit: DEFAULT_WORKER_LIMIT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Bound on resource types matched at once
    pub fn with_worker_limit(mut self, limit: usize) -> Self {
        self.worker_limit = limit.max(1);
        self
    }

    /// Deadline applied to every individual source query
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Match every mapping against every source
    ///
    /// A resource type for which every source failed keeps its failures in
    /// the report and gets no matches. The call fails with
    /// [`Error::NoSourcesAvailable`] only when the registry is empty or every
    /// source failed for every resource type, and with [`Error::Canceled`] as
    /// soon as `cancel` fires.
    pub async fn match_all(
        &self,
        mappings: &[ResourceTypeMapping],
        cancel: &CancellationToken,
    ) -> Result<MatchReport> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if self.registry.is_empty()
            && let Some(first) = mappings.first()
        {
            return Err(Error::NoSourcesAvailable {
                resource_type: first.resource_type.name.clone(),
            });
        }

        let positions = self.registry.effective_order(&self.options.preferred_sources);
        info!(
            "Matching {} dependencies against {} source(s)",
            mappings.len(),
            self.registry.len()
        );

        let results: Vec<_> = stream::iter(mappings)
            .map(|mapping| self.match_one(mapping, &positions, cancel))
            .buffered(self.worker_limit)
            .collect()
            .await;

        let mut report = MatchReport::default();
        let mut exhausted = Vec::new();
        for (mapping, result) in mappings.iter().zip(results) {
            let (matches, failures) = result?;
            if failures.len() == self.registry.len() {
                warn!(
                    "Every recipe source failed for {} ({})",
                    mapping.dependency_id, mapping.resource_type
                );
                exhausted.push(mapping.resource_type.name.clone());
            }
            report.matches.extend(matches);
            report.failures.extend(failures);
        }

        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if !mappings.is_empty() && exhausted.len() == mappings.len() {
            return Err(Error::NoSourcesAvailable {
                resource_type: exhausted.join(", "),
            });
        }
        Ok(report)
    }

    async fn match_one(
        &self,
        mapping: &ResourceTypeMapping,
        positions: &[usize],
        cancel: &CancellationToken,
    ) -> Result<(Vec<RecipeMatch>, Vec<SourceFailure>)> {
        let sources = self.registry.all();
        let ctx = QueryContext::new(cancel.clone(), self.options.cloud_provider);
        let queries = sources
            .iter()
            .map(|source| self.query_source(source.as_ref(), &ctx, mapping));
        let results = join_all(queries).await;

        let mut tagged = Vec::new();
        let mut failures = Vec::new();
        for (idx, (source, result)) in sources.iter().zip(results).enumerate() {
            match result {
                Ok(candidates) => {
                    for (order, candidate) in candidates.into_iter().enumerate() {
                        tagged.push(Tagged {
                            position: positions.get(idx).copied().unwrap_or(idx),
                            order,
                            source: source.name().to_string(),
                            candidate,
                        });
                    }
                }
                Err(Error::Canceled) => return Err(Error::Canceled),
                Err(e) => {
                    warn!(
                        "Source '{}' failed for {} ({}): {}",
                        source.name(),
                        mapping.dependency_id,
                        mapping.resource_type,
                        e
                    );
                    failures.push(SourceFailure {
                        source: source.name().to_string(),
                        dependency_id: mapping.dependency_id.clone(),
                        resource_type: mapping.resource_type.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let matches = self.rank_candidates(mapping, tagged);
        debug!(
            "{} ({}): {} match(es) after filtering",
            mapping.dependency_id,
            mapping.resource_type,
            matches.len()
        );
        Ok((matches, failures))
    }

    /// Query one source under the run's cancellation and the per-source deadline
    async fn query_source(
        &self,
        source: &dyn RecipeSource,
        ctx: &QueryContext,
        mapping: &ResourceTypeMapping,
    ) -> Result<Vec<Candidate>> {
        let source_ctx = QueryContext::new(ctx.cancel.child_token(), ctx.cloud_provider);

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(Error::Canceled),
            result = tokio::time::timeout(self.source_timeout, source.query(&source_ctx, mapping)) => {
                match result {
                    Ok(Err(Error::Canceled)) if !ctx.cancel.is_cancelled() => Err(Error::source_unavailable(
                        source.name(),
                        "query canceled by source",
                    )),
                    Ok(result) => result,
                    Err(_) => {
                        source_ctx.cancel.cancel();
                        Err(Error::source_unavailable(
                            source.name(),
                            format!("timed out after {}ms", self.source_timeout.as_millis()),
                        ))
                    }
                }
            }
        }
    }

    /// Filter, order and cap the fan-in results for one mapping
    fn rank_candidates(&self, mapping: &ResourceTypeMapping, mut tagged: Vec<Tagged>) -> Vec<RecipeMatch> {
        let before = tagged.len();
        tagged.retain(|t| t.candidate.confidence >= self.options.min_confidence);
        if tagged.len() < before {
            debug!(
                "{}: dropped {} candidate(s) below confidence {}",
                mapping.dependency_id,
                before - tagged.len(),
                self.options.min_confidence
            );
        }

        tagged.sort_by(|a, b| {
            b.candidate
                .confidence
                .total_cmp(&a.candidate.confidence)
                .then(a.position.cmp(&b.position))
                .then(a.order.cmp(&b.order))
        });
        tagged.truncate(self.options.max_matches);

        tagged
            .into_iter()
            .map(|t| {
                let mut reasons = t.candidate.reasons;
                if reasons.is_empty() {
                    reasons.push(format!("offered by source '{}'", t.source));
                }
                RecipeMatch {
                    dependency_id: mapping.dependency_id.clone(),
                    recipe: t.candidate.recipe,
                    score: t.candidate.confidence,
                    match_reasons: reasons,
                    source: t.source,
                    registry_position: t.position,
                }
            })
            .collect()
    }
}

/// Compare two matches by score descending, then tie-break position
pub fn compare_matches(a: &RecipeMatch, b: &RecipeMatch) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.registry_position.cmp(&b.registry_position))
}
