// src/config.rs
//! Engine configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [matcher] - Confidence threshold, match cap, preferred sources, workers
//! - [resolution] - Ranking policy and preferred IaC language
//! - [[sources]] - Recipe sources, in registration order
//! - [packs] - Recipe pack scope and local store

use crate::error::{Error, Result};
use crate::practices::detect_iac_language;
use crate::types::{CloudProvider, IacLanguage, MatcherOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scope that singleton recipe packs are created in
pub const DEFAULT_PACK_SCOPE: &str = "/planes/radius/local/resourceGroups/default";

/// TOML configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Matching settings
    #[serde(default)]
    pub matcher: MatcherSection,

    /// Ranking settings
    #[serde(default)]
    pub resolution: ResolutionSection,

    /// Recipe sources, registered in list order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    /// Recipe pack settings
    #[serde(default)]
    pub packs: PacksSection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherSection::default(),
            resolution: ResolutionSection::default(),
            sources: default_sources(),
            packs: PacksSection::default(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("local", SourceType::Local),
        SourceConfig {
            provider: Some(CloudProvider::Kubernetes),
            ..SourceConfig::new("kubernetes", SourceType::Catalog)
        },
        SourceConfig::new("generated", SourceType::Generated),
    ]
}

/// Matcher configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherSection {
    /// Candidates below this confidence are discarded (0.0-1.0)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Maximum matches kept per dependency
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,

    /// Source names that win ties ahead of registry order
    #[serde(default)]
    pub preferred_sources: Vec<String>,

    /// Platform of the target environment
    #[serde(default)]
    pub cloud_provider: CloudProvider,

    /// Resource types matched concurrently
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,

    /// Per-source query deadline in milliseconds
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_matches: default_max_matches(),
            preferred_sources: Vec::new(),
            cloud_provider: CloudProvider::Unknown,
            worker_limit: default_worker_limit(),
            source_timeout_ms: default_source_timeout_ms(),
        }
    }
}

impl MatcherSection {
    /// Matcher options described by this section
    pub fn options(&self) -> MatcherOptions {
        MatcherOptions {
            min_confidence: self.min_confidence,
            max_matches: self.max_matches,
            preferred_sources: self.preferred_sources.clone(),
            cloud_provider: self.cloud_provider,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_max_matches() -> usize {
    3
}

fn default_worker_limit() -> usize {
    4
}

fn default_source_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Which ranking policy the priority resolver applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Fixed source-kind order
    Fixed,
    /// Biased towards the project's preferred IaC language
    #[default]
    Preference,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Fixed => write!(f, "fixed"),
            PolicyKind::Preference => write!(f, "preference"),
        }
    }
}

/// Preferred IaC language, or detect it from the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguagePreference {
    #[default]
    Auto,
    Terraform,
    Bicep,
}

impl LanguagePreference {
    /// Concrete language, detecting it under `project_root` for `Auto`
    pub fn resolve(&self, project_root: &Path) -> IacLanguage {
        match self {
            LanguagePreference::Auto => detect_iac_language(project_root),
            LanguagePreference::Terraform => IacLanguage::Terraform,
            LanguagePreference::Bicep => IacLanguage::Bicep,
        }
    }
}

/// Resolution configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionSection {
    #[serde(default)]
    pub policy: PolicyKind,

    #[serde(default)]
    pub prefer_language: LanguagePreference,

    /// Pick a winner without asking whenever ranking allows it
    #[serde(default = "default_true")]
    pub auto_resolve: bool,
}

impl Default for ResolutionSection {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            prefer_language: LanguagePreference::default(),
            auto_resolve: true,
        }
    }
}

/// Kind of a configured source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Catalog,
    Generated,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Local => write!(f, "local"),
            SourceType::Catalog => write!(f, "catalog"),
            SourceType::Generated => write!(f, "generated"),
        }
    }
}

/// One `[[sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name
    pub name: String,

    pub kind: SourceType,

    /// Project root for local sources (defaults to the working directory)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Target platform of a catalog
    #[serde(default)]
    pub provider: Option<CloudProvider>,

    /// Contents API override for a catalog
    #[serde(default)]
    pub url: Option<String>,

    /// Template download base matching `url`
    #[serde(default)]
    pub raw_url: Option<String>,

    /// Serve a catalog from the built-in table instead of the network
    #[serde(default)]
    pub offline: bool,

    /// HTTP timeout for a catalog in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Generate a Kubernetes template for types without a pattern
    #[serde(default)]
    pub fallback: bool,
}

impl SourceConfig {
    pub fn new(name: &str, kind: SourceType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            path: None,
            provider: None,
            url: None,
            raw_url: None,
            offline: false,
            timeout_ms: None,
            fallback: false,
        }
    }
}

/// Recipe pack configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacksSection {
    /// Scope singleton packs are created in
    #[serde(default = "default_pack_scope")]
    pub scope: String,

    /// Directory holding one JSON document per pack
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

impl Default for PacksSection {
    fn default() -> Self {
        Self {
            scope: default_pack_scope(),
            store_dir: default_store_dir(),
        }
    }
}

fn default_pack_scope() -> String {
    DEFAULT_PACK_SCOPE.to_string()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".recipe-engine/packs")
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative source and store paths are resolved against the directory
    /// containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.matcher.min_confidence) {
            return Err(Error::ConfigError(format!(
                "matcher.min_confidence must be between 0.0 and 1.0, got {}",
                self.matcher.min_confidence
            )));
        }
        if self.matcher.max_matches == 0 {
            return Err(Error::ConfigError("matcher.max_matches must be at least 1".to_string()));
        }
        if self.matcher.worker_limit == 0 {
            return Err(Error::ConfigError("matcher.worker_limit must be at least 1".to_string()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(Error::ConfigError("source name must not be empty".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(Error::ConfigError(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if source.kind == SourceType::Catalog && source.provider.is_none() {
                return Err(Error::ConfigError(format!(
                    "catalog source '{}' requires a provider",
                    source.name
                )));
            }
            if source.kind == SourceType::Catalog
                && !source.offline
                && source.url.is_some() != source.raw_url.is_some()
            {
                return Err(Error::ConfigError(format!(
                    "catalog source '{}' must set url and raw_url together",
                    source.name
                )));
            }
        }

        if self.packs.scope.trim().is_empty() {
            return Err(Error::ConfigError("packs.scope must not be empty".to_string()));
        }

        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            if let Some(path) = &source.path
                && path.is_relative()
            {
                source.path = Some(base.join(path));
            }
        }
        if self.packs.store_dir.is_relative() {
            self.packs.store_dir = base.join(&self.packs.store_dir);
        }
    }

    /// Project root scanned by the first local source, if any
    pub fn project_root(&self) -> PathBuf {
        self.sources
            .iter()
            .find(|s| s.kind == SourceType::Local)
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[1].provider, Some(CloudProvider::Kubernetes));
        assert_eq!(config.matcher.min_confidence, 0.3);
        assert_eq!(config.matcher.max_matches, 3);
        assert_eq!(config.resolution.policy, PolicyKind::Preference);
        assert!(config.resolution.auto_resolve);
        assert_eq!(config.packs.scope, DEFAULT_PACK_SCOPE);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.matcher.worker_limit, 4);
        assert_eq!(config.matcher.source_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[matcher]
min_confidence = 0.5
max_matches = 2
preferred_sources = ["team"]
cloud_provider = "azure"

[resolution]
policy = "fixed"
prefer_language = "terraform"
auto_resolve = false

[[sources]]
name = "team"
kind = "local"
path = "infra"

[[sources]]
name = "azure"
kind = "catalog"
provider = "azure"
offline = true

[packs]
scope = "/planes/radius/local/resourceGroups/dev"
"#;
        let config = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(config.matcher.min_confidence, 0.5);
        assert_eq!(config.matcher.options().preferred_sources, vec!["team"]);
        assert_eq!(config.matcher.options().cloud_provider, CloudProvider::Azure);
        assert_eq!(config.resolution.policy, PolicyKind::Fixed);
        assert_eq!(config.resolution.prefer_language, LanguagePreference::Terraform);
        assert!(!config.resolution.auto_resolve);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, SourceType::Local);
        assert!(config.sources[1].offline);
        assert_eq!(config.packs.scope, "/planes/radius/local/resourceGroups/dev");
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "[matcher]\nmin_confidence = 1.5\n",
            "[matcher]\nmax_matches = 0\n",
            "[matcher]\nworker_limit = 0\n",
            "[[sources]]\nname = \"a\"\nkind = \"generated\"\n[[sources]]\nname = \"a\"\nkind = \"local\"\n",
            "[[sources]]\nname = \"cat\"\nkind = \"catalog\"\n",
            "[[sources]]\nname = \"\"\nkind = \"generated\"\n",
            "[[sources]]\nname = \"cat\"\nkind = \"catalog\"\nprovider = \"aws\"\nurl = \"https://mirror.example/api\"\n",
        ];
        for case in cases {
            let result = EngineConfig::from_toml(case);
            assert!(
                matches!(result, Err(Error::ConfigError(_))),
                "expected config error for {case:?}"
            );
        }
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let result = EngineConfig::from_toml("[[sources]]\nname = \"x\"\nkind = \"ftp\"\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "[[sources]]\nname = \"local\"\nkind = \"local\"\npath = \"infra\"\n\n[packs]\nstore_dir = \"packs\"\n",
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.sources[0].path, Some(dir.path().join("infra")));
        assert_eq!(config.packs.store_dir, dir.path().join("packs"));
        assert_eq!(config.project_root(), dir.path().join("infra"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load(Path::new("/nonexistent/engine.toml"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_language_preference_resolve() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        assert_eq!(LanguagePreference::Auto.resolve(dir.path()), IacLanguage::Terraform);
        assert_eq!(LanguagePreference::Bicep.resolve(dir.path()), IacLanguage::Bicep);
    }
}
