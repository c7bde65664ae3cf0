// src/selection/mod.rs

//! Top-level resolution of a batch of dependencies
//!
//! The [`SelectionCoordinator`] runs the [`Matcher`], lets the
//! [`PriorityResolver`] pick a winner per dependency, and hands ties (or
//! every dependency, when automatic resolution is off) to a [`Selector`].
//! Without a selector, ties are left for the user as "needs manual recipe".

mod prompt;

pub use prompt::{Selector, TerminalSelector, prompt_choice};

use crate::error::{Error, Result};
use crate::matcher::{Matcher, SourceFailure, compare_matches};
use crate::priority::{PriorityResolver, Resolution, ResolutionState};
use crate::types::{Recipe, RecipeMatch, ResourceTypeMapping};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Option offered last in every prompt
pub const SKIP_OPTION: &str = "Skip (no recipe)";

/// Reason text recorded on a manual pick
pub const USER_SELECTED_REASON: &str = "user selected";

/// Who picked the winning recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Auto,
    User,
}

/// Why a dependency ended up without a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The user chose the skip option
    Declined,
    /// No source offered a candidate above the threshold
    NoCandidates,
    /// Candidates tied and nobody was asked to choose
    NeedsManualRecipe { candidates: Vec<String> },
}

/// Final outcome for one dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DependencyOutcome {
    Resolved { matched: RecipeMatch, decision: Decision },
    Skipped { reason: SkipReason },
}

impl DependencyOutcome {
    fn skipped(reason: SkipReason) -> Self {
        DependencyOutcome::Skipped { reason }
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        match self {
            DependencyOutcome::Resolved { matched, .. } => Some(&matched.recipe),
            DependencyOutcome::Skipped { .. } => None,
        }
    }

    pub fn state(&self) -> ResolutionState {
        match self {
            DependencyOutcome::Resolved { decision: Decision::Auto, .. } => ResolutionState::AutoResolved,
            DependencyOutcome::Resolved { decision: Decision::User, .. } => ResolutionState::Resolved,
            DependencyOutcome::Skipped { .. } => ResolutionState::Skipped,
        }
    }
}

/// Everything a resolution run produced
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub outcomes: BTreeMap<String, DependencyOutcome>,
    pub failures: Vec<SourceFailure>,
    /// All ranked matches, in input order
    pub matches: Vec<RecipeMatch>,
}

/// Counts and gaps of a [`ResolutionReport`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub resolved: usize,
    pub skipped: usize,
    /// Dependency to the sources that failed for it
    pub failed_sources: BTreeMap<String, Vec<String>>,
    /// Dependencies left without a recipe
    pub unresolved: Vec<String>,
}

impl ResolutionReport {
    /// Dependency to chosen recipe, `None` when skipped
    pub fn recipes(&self) -> BTreeMap<String, Option<Recipe>> {
        self.outcomes
            .iter()
            .map(|(dep, outcome)| (dep.clone(), outcome.recipe().cloned()))
            .collect()
    }

    pub fn summary(&self) -> ResolutionSummary {
        let mut summary = ResolutionSummary::default();
        for (dep, outcome) in &self.outcomes {
            match outcome {
                DependencyOutcome::Resolved { .. } => summary.resolved += 1,
                DependencyOutcome::Skipped { .. } => {
                    summary.skipped += 1;
                    summary.unresolved.push(dep.clone());
                }
            }
        }
        for failure in &self.failures {
            summary
                .failed_sources
                .entry(failure.dependency_id.clone())
                .or_default()
                .push(failure.source.clone());
        }
        summary
    }
}

/// Runs matching and resolution for a batch of dependencies
pub struct SelectionCoordinator {
    matcher: Matcher,
    resolver: PriorityResolver,
    selector: Option<Arc<dyn Selector>>,
    auto_resolve: bool,
}

impl SelectionCoordinator {
    pub fn new(matcher: Matcher, resolver: PriorityResolver) -> Self {
        Self {
            matcher,
            resolver,
            selector: None,
            auto_resolve: true,
        }
    }

    /// Ask `selector` whenever a choice cannot be made automatically
    pub fn with_selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// When disabled, every dependency with candidates goes to the selector
    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Resolve every mapping to a recipe or a skip
    ///
    /// Source failures are carried in the report. Only total source failure
    /// for a resource type, selector errors and cancellation abort the run.
    pub async fn resolve(
        &self,
        mappings: &[ResourceTypeMapping],
        cancel: &CancellationToken,
    ) -> Result<ResolutionReport> {
        let mut seen = HashSet::new();
        let unique: Vec<ResourceTypeMapping> = mappings
            .iter()
            .filter(|m| seen.insert(m.dependency_id.as_str()))
            .cloned()
            .collect();
        if unique.len() < mappings.len() {
            warn!(
                "Ignoring {} repeated dependency ID(s)",
                mappings.len() - unique.len()
            );
        }

        let match_report = self.matcher.match_all(&unique, cancel).await?;
        let grouped = match_report.grouped();

        let mut report = ResolutionReport {
            failures: match_report.failures.clone(),
            matches: match_report.matches,
            ..ResolutionReport::default()
        };

        for mapping in &unique {
            let matches = grouped
                .get(&mapping.dependency_id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let outcome = self.decide(mapping, matches, cancel).await?;
            match &outcome {
                DependencyOutcome::Resolved { matched, decision } => info!(
                    "{}: using recipe '{}' from {} ({:?})",
                    mapping.dependency_id, matched.recipe.name, matched.source, decision
                ),
                DependencyOutcome::Skipped { reason } => info!(
                    "{}: no recipe for {} ({:?})",
                    mapping.dependency_id, mapping.resource_type, reason
                ),
            }
            report.outcomes.insert(mapping.dependency_id.clone(), outcome);
        }

        Ok(report)
    }

    async fn decide(
        &self,
        mapping: &ResourceTypeMapping,
        matches: &[RecipeMatch],
        cancel: &CancellationToken,
    ) -> Result<DependencyOutcome> {
        if matches.is_empty() {
            return Ok(DependencyOutcome::skipped(SkipReason::NoCandidates));
        }

        if !self.auto_resolve
            && let Some(selector) = &self.selector
        {
            return self.ask(selector.as_ref(), mapping, matches, cancel).await;
        }

        match self.resolver.resolve(matches) {
            Resolution::Resolved(winner) => Ok(DependencyOutcome::Resolved {
                matched: winner,
                decision: Decision::Auto,
            }),
            Resolution::NoCandidates => Ok(DependencyOutcome::skipped(SkipReason::NoCandidates)),
            Resolution::Ambiguous(tied) => match &self.selector {
                Some(selector) => self.ask(selector.as_ref(), mapping, &tied, cancel).await,
                None => {
                    let err = Error::AmbiguousMatch {
                        dependency_id: mapping.dependency_id.clone(),
                        candidates: tied.len(),
                    };
                    warn!("{}; needs a manual recipe", err);
                    Ok(DependencyOutcome::skipped(SkipReason::NeedsManualRecipe {
                        candidates: tied.iter().map(|m| m.recipe.name.clone()).collect(),
                    }))
                }
            },
        }
    }

    /// Prompt for one of `candidates` and record the answer
    async fn ask(
        &self,
        selector: &dyn Selector,
        mapping: &ResourceTypeMapping,
        candidates: &[RecipeMatch],
        cancel: &CancellationToken,
    ) -> Result<DependencyOutcome> {
        let mut sorted: Vec<&RecipeMatch> = candidates.iter().collect();
        sorted.sort_by(|a, b| compare_matches(a, b));

        let labels = option_labels(&sorted);
        let mut options = labels.clone();
        options.push(SKIP_OPTION.to_string());

        let prompt = format!(
            "Select a recipe for {} ({}):",
            mapping.dependency_id, mapping.resource_type
        );
        debug!("Asking for a choice among {} candidate(s)", sorted.len());

        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            answer = selector.choose(&prompt, &options) => answer?,
        };

        if answer == SKIP_OPTION {
            return Ok(DependencyOutcome::skipped(SkipReason::Declined));
        }

        let Some(idx) = labels.iter().position(|label| *label == answer) else {
            return Err(Error::SelectorError(format!(
                "selector returned unknown option '{}'",
                answer
            )));
        };

        let chosen = sorted[idx];
        Ok(DependencyOutcome::Resolved {
            matched: RecipeMatch {
                dependency_id: mapping.dependency_id.clone(),
                recipe: chosen.recipe.clone(),
                score: 1.0,
                match_reasons: vec![USER_SELECTED_REASON.to_string()],
                source: chosen.source.clone(),
                registry_position: chosen.registry_position,
            },
            decision: Decision::User,
        })
    }
}

/// `name (kind, NN%)`, with the location appended where labels collide
fn option_labels(matches: &[&RecipeMatch]) -> Vec<String> {
    let base: Vec<String> = matches
        .iter()
        .map(|m| format!("{} ({}, {}%)", m.recipe.name, m.recipe.source_kind, m.score_percent()))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in &base {
        *counts.entry(label.as_str()).or_default() += 1;
    }

    base.iter()
        .zip(matches)
        .map(|(label, m)| {
            if counts[label.as_str()] > 1 {
                format!("{} [{}]", label, m.recipe.source_location)
            } else {
                label.clone()
            }
        })
        .collect()
}
