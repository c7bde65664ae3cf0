// src/lib.rs

//! Recipe Resolution Engine
//!
//! Resolves the infrastructure dependencies of an application to concrete
//! provisioning recipes (Terraform or Bicep modules).
//!
//! # Architecture
//!
//! - Sources: local project scan, curated catalogs and a generated fallback,
//!   all behind the [`RecipeSource`] trait and held in a [`SourceRegistry`]
//! - Matching: concurrent fan-out to every source, deterministic fan-in
//! - Ranking: injectable rule-list policies pick one winner per dependency
//! - Selection: ties go to an interactive [`Selector`] or are left for manual choice
//! - Packs: conflict inspection and idempotent creation of built-in packs

pub mod config;
mod error;
pub mod matcher;
pub mod pack;
pub mod practices;
pub mod priority;
pub mod selection;
pub mod source;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use matcher::{MatchReport, Matcher, SourceFailure};
pub use pack::{ConflictDetector, InspectionReport, PackClient, ensure_missing_singletons};
pub use priority::{PriorityResolver, RankingPolicy, Resolution, ResolutionState, RulePolicy};
pub use selection::{
    DependencyOutcome, ResolutionReport, SelectionCoordinator, Selector, SkipReason,
    TerminalSelector,
};
pub use source::{Candidate, QueryContext, RecipeSource, SourceRegistry};
pub use types::{
    CloudProvider, IacLanguage, MatcherOptions, Recipe, RecipeMatch, ResourceType,
    ResourceTypeMapping, SourceKind,
};
