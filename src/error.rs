// src/error.rs

//! Error types for recipe resolution
//!
//! Failures of a single source are recoverable and normally end up as
//! [`crate::matcher::SourceFailure`] records instead of propagating. The
//! remaining variants are fatal to the call that produced them.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the resolution engine
#[derive(Error, Debug)]
pub enum Error {
    /// A source could not reach its backing system (filesystem, network)
    #[error("Recipe source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Every registered source failed for a resource type
    #[error("No recipe sources available for resource type {resource_type}")]
    NoSourcesAvailable { resource_type: String },

    /// A source with the same name is already registered
    #[error("Recipe source '{0}' is already registered")]
    DuplicateSourceName(String),

    /// Automatic resolution could not pick a single candidate
    #[error("Ambiguous recipe match for dependency {dependency_id}: {candidates} candidates tie")]
    AmbiguousMatch {
        dependency_id: String,
        candidates: usize,
    },

    /// More than one recipe pack claims the same resource type
    #[error("{0}")]
    ConflictDetected(String),

    /// A referenced recipe pack exists but could not be read
    #[error("Failed to fetch recipe pack '{pack}': {reason}")]
    PackFetchFailed { pack: String, reason: String },

    /// Writing a recipe pack failed
    #[error("Failed to write recipe pack '{pack}': {reason}")]
    PackWriteFailed { pack: String, reason: String },

    /// A recipe pack resource ID could not be parsed
    #[error("Invalid recipe pack ID: {0}")]
    InvalidPackId(String),

    /// The resolution run was canceled or its deadline elapsed
    #[error("Resolution canceled")]
    Canceled,

    /// The interactive selector failed or returned an unknown option
    #[error("Selector error: {0}")]
    SelectorError(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed input (resource types, recipe indexes)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Filesystem error with context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Underlying I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Build a `SourceUnavailable` error for the named source
    pub fn source_unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only affects a single source and may be tolerated
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SourceUnavailable { .. })
    }
}
