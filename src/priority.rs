// src/priority.rs

//! Winner selection among the matches for one dependency
//!
//! A [`RankingPolicy`] maps every match to a rank (lower is better). The
//! [`PriorityResolver`] keeps the matches at the best rank, breaks ties by
//! score and then by source position, and reports [`Resolution::Ambiguous`]
//! when candidates are still indistinguishable.
//!
//! Two policies ship as ordered rule lists:
//!
//! | rank | fixed                          | preference                      |
//! |------|--------------------------------|---------------------------------|
//! | 1    | local, active language         | local, preferred language       |
//! | 2    | catalog                        | any recipe in preferred language|
//! | 3    | generated                      | other local                     |
//! | 4    |                                | catalog                         |
//! | 5    | anything else                  | generated                       |
//! | 6    |                                | anything else                   |
//!
//! Catalog recipes built for a platform incompatible with the active cloud
//! provider never match a rule and fall to the last rank.

use crate::error::{Error, Result};
use crate::matcher::compare_matches;
use crate::types::{CloudProvider, IacLanguage, RecipeMatch, SourceKind};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ranking strategy used by the [`PriorityResolver`]
pub trait RankingPolicy: Send + Sync {
    /// Policy name for logs
    fn name(&self) -> &str;

    /// Rank of a match; lower ranks win
    fn rank(&self, candidate: &RecipeMatch) -> u32;
}

/// Predicate of a ranking rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// Found in the project and written in the given language
    LocalInLanguage(IacLanguage),
    /// Written in the given language, from any source
    Language(IacLanguage),
    /// Found in the project
    Local,
    /// Offered by a catalog
    Catalog,
    /// Synthesized from a pattern
    Generated,
}

impl RuleCondition {
    fn matches(&self, candidate: &RecipeMatch) -> bool {
        let kind = candidate.recipe.source_kind;
        match self {
            RuleCondition::LocalInLanguage(language) => {
                kind == SourceKind::LocalScan && candidate.recipe.language() == Some(*language)
            }
            RuleCondition::Language(language) => candidate.recipe.language() == Some(*language),
            RuleCondition::Local => kind == SourceKind::LocalScan,
            RuleCondition::Catalog => matches!(kind, SourceKind::Catalog(_)),
            RuleCondition::Generated => kind == SourceKind::Generated,
        }
    }
}

/// One entry of a rule list: candidates meeting `condition` get `rank`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankRule {
    pub rank: u32,
    pub condition: RuleCondition,
}

impl RankRule {
    pub fn new(rank: u32, condition: RuleCondition) -> Self {
        Self { rank, condition }
    }
}

/// Ranking policy expressed as an ordered rule list
///
/// The first matching rule decides the rank; unmatched candidates get the
/// fallback rank.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    name: String,
    rules: Vec<RankRule>,
    fallback_rank: u32,
    cloud_provider: CloudProvider,
}

impl RulePolicy {
    pub fn new(name: &str, rules: Vec<RankRule>, fallback_rank: u32) -> Self {
        Self {
            name: name.to_string(),
            rules,
            fallback_rank,
            cloud_provider: CloudProvider::Unknown,
        }
    }

    /// Catalog recipes for incompatible platforms are ranked last
    pub fn with_cloud_provider(mut self, provider: CloudProvider) -> Self {
        self.cloud_provider = provider;
        self
    }

    /// Fixed source-kind order, used when registering recipes into packs
    pub fn fixed(active_language: IacLanguage, provider: CloudProvider) -> Self {
        Self::new(
            "fixed",
            vec![
                RankRule::new(1, RuleCondition::LocalInLanguage(active_language)),
                RankRule::new(2, RuleCondition::Catalog),
                RankRule::new(3, RuleCondition::Generated),
            ],
            5,
        )
        .with_cloud_provider(provider)
    }

    /// Order biased towards the project's preferred language
    pub fn preference(prefer_language: IacLanguage, provider: CloudProvider) -> Self {
        Self::new(
            "preference",
            vec![
                RankRule::new(1, RuleCondition::LocalInLanguage(prefer_language)),
                RankRule::new(2, RuleCondition::Language(prefer_language)),
                RankRule::new(3, RuleCondition::Local),
                RankRule::new(4, RuleCondition::Catalog),
                RankRule::new(5, RuleCondition::Generated),
            ],
            6,
        )
        .with_cloud_provider(provider)
    }

    pub fn rules(&self) -> &[RankRule] {
        &self.rules
    }

    fn has_affinity(&self, candidate: &RecipeMatch) -> bool {
        match candidate.recipe.source_kind {
            SourceKind::Catalog(provider) => provider.is_compatible_with(self.cloud_provider),
            _ => true,
        }
    }
}

impl RankingPolicy for RulePolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank(&self, candidate: &RecipeMatch) -> u32 {
        if !self.has_affinity(candidate) {
            return self.fallback_rank;
        }
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(candidate))
            .map(|rule| rule.rank)
            .unwrap_or(self.fallback_rank)
    }
}

/// Lifecycle of one dependency through resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    AutoResolved,
    AwaitingUserChoice,
    Resolved,
    Skipped,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionState::Unresolved => write!(f, "unresolved"),
            ResolutionState::AutoResolved => write!(f, "auto-resolved"),
            ResolutionState::AwaitingUserChoice => write!(f, "awaiting user choice"),
            ResolutionState::Resolved => write!(f, "resolved"),
            ResolutionState::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of ranking the matches for one dependency
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A single winner
    Resolved(RecipeMatch),
    /// Candidates that tie on rank, score and position, best first
    Ambiguous(Vec<RecipeMatch>),
    /// Nothing to choose from
    NoCandidates,
}

impl Resolution {
    /// State the dependency moves to after ranking
    pub fn state(&self) -> ResolutionState {
        match self {
            Resolution::Resolved(_) => ResolutionState::AutoResolved,
            Resolution::Ambiguous(_) => ResolutionState::AwaitingUserChoice,
            Resolution::NoCandidates => ResolutionState::Skipped,
        }
    }

    /// The winner, failing with [`Error::AmbiguousMatch`] on a tie
    pub fn into_winner(self, dependency_id: &str) -> Result<Option<RecipeMatch>> {
        match self {
            Resolution::Resolved(winner) => Ok(Some(winner)),
            Resolution::NoCandidates => Ok(None),
            Resolution::Ambiguous(tied) => Err(Error::AmbiguousMatch {
                dependency_id: dependency_id.to_string(),
                candidates: tied.len(),
            }),
        }
    }
}

/// Picks one winner per dependency under a ranking policy
#[derive(Clone)]
pub struct PriorityResolver {
    policy: Arc<dyn RankingPolicy>,
}

impl PriorityResolver {
    pub fn new(policy: Arc<dyn RankingPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &dyn RankingPolicy {
        self.policy.as_ref()
    }

    /// Resolve the matches of a single dependency
    pub fn resolve(&self, matches: &[RecipeMatch]) -> Resolution {
        let Some(best_rank) = matches.iter().map(|m| self.policy.rank(m)).min() else {
            return Resolution::NoCandidates;
        };

        let mut best: Vec<&RecipeMatch> = matches
            .iter()
            .filter(|m| self.policy.rank(m) == best_rank)
            .collect();

        if let [winner] = best.as_slice() {
            debug!(
                "{}: '{}' wins at rank {} under {} policy",
                winner.dependency_id,
                winner.recipe.name,
                best_rank,
                self.policy.name()
            );
            return Resolution::Resolved((*winner).clone());
        }

        best.sort_by(|a, b| compare_matches(a, b));
        let top = best[0];
        let tied: Vec<RecipeMatch> = best
            .iter()
            .filter(|m| compare_matches(m, top).is_eq())
            .map(|m| (*m).clone())
            .collect();

        if tied.len() == 1 {
            debug!(
                "{}: '{}' wins tie-break at rank {} (score {:.2}, position {})",
                top.dependency_id,
                top.recipe.name,
                best_rank,
                top.score,
                top.registry_position
            );
            Resolution::Resolved(top.clone())
        } else {
            debug!(
                "{}: {} candidates tie at rank {}",
                top.dependency_id,
                tied.len(),
                best_rank
            );
            Resolution::Ambiguous(tied)
        }
    }
}
