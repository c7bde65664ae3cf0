// src/types.rs

//! Core data model for recipe resolution
//!
//! `ResourceTypeMapping` values come from discovery and are immutable input
//! for one run. `RecipeMatch` values are created fresh per run; only the
//! chosen `Recipe` for each dependency leaves the engine.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A canonical `<namespace>/<type>` resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    /// Canonical name, e.g. `Radius.Data/redisCaches`
    pub name: String,
    /// API version of the type definition
    #[serde(default)]
    pub api_version: String,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_version: api_version.into(),
        }
    }

    /// Namespace part (`Radius.Data`)
    pub fn namespace(&self) -> Option<&str> {
        split_resource_type(&self.name).map(|(ns, _)| ns)
    }

    /// Type part (`redisCaches`)
    pub fn type_name(&self) -> Option<&str> {
        split_resource_type(&self.name).map(|(_, t)| t)
    }

    /// Category: last dotted segment of the namespace (`Data`)
    pub fn category(&self) -> Option<&str> {
        parse_resource_type(&self.name).map(|(category, _)| category)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn split_resource_type(name: &str) -> Option<(&str, &str)> {
    let (namespace, type_name) = name.split_once('/')?;
    if namespace.is_empty() || type_name.is_empty() || type_name.contains('/') {
        return None;
    }
    Some((namespace, type_name))
}

/// Split a resource type into `(category, type name)`
///
/// `Radius.Data/mySqlDatabases` becomes `("Data", "mySqlDatabases")`. Returns
/// `None` when the name is not `<namespace>/<type>` or the namespace is not dotted.
pub fn parse_resource_type(name: &str) -> Option<(&str, &str)> {
    let (namespace, type_name) = split_resource_type(name)?;
    let (_, category) = namespace.rsplit_once('.')?;
    if category.is_empty() {
        return None;
    }
    Some((category, type_name))
}

/// One detected dependency mapped to the resource type that satisfies it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeMapping {
    /// Unique within a single discovery run
    pub dependency_id: String,
    pub resource_type: ResourceType,
}

impl ResourceTypeMapping {
    pub fn new(dependency_id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            dependency_id: dependency_id.into(),
            resource_type,
        }
    }
}

/// Target platform of a recipe or of the current environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Azure,
    Aws,
    Gcp,
    Kubernetes,
    #[default]
    Unknown,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Azure => "azure",
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Kubernetes => "kubernetes",
            CloudProvider::Unknown => "unknown",
        }
    }

    /// Whether a recipe built for `self` can serve an environment on `active`
    ///
    /// Unknown on either side is compatible with everything. Kubernetes
    /// recipes run on any cluster regardless of the hosting cloud.
    pub fn is_compatible_with(&self, active: CloudProvider) -> bool {
        matches!(self, CloudProvider::Unknown | CloudProvider::Kubernetes)
            || active == CloudProvider::Unknown
            || *self == active
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azure" => Ok(CloudProvider::Azure),
            "aws" => Ok(CloudProvider::Aws),
            "gcp" => Ok(CloudProvider::Gcp),
            "kubernetes" | "k8s" => Ok(CloudProvider::Kubernetes),
            "unknown" | "" => Ok(CloudProvider::Unknown),
            other => Err(Error::ParseError(format!("unknown cloud provider: {other}"))),
        }
    }
}

/// Infrastructure-as-code dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacLanguage {
    Terraform,
    Bicep,
}

impl IacLanguage {
    /// The other dialect
    pub fn other(&self) -> IacLanguage {
        match self {
            IacLanguage::Terraform => IacLanguage::Bicep,
            IacLanguage::Bicep => IacLanguage::Terraform,
        }
    }

    /// Infer the dialect of a recipe from its location
    ///
    /// File extensions win, then registry prefixes (`br:` / `br/` for Bicep
    /// registries), then path fragments. Returns `None` for locations such as
    /// plain OCI references that do not reveal their dialect.
    pub fn from_location(location: &str) -> Option<IacLanguage> {
        let lower = location.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or(&lower);

        if path.ends_with(".tf") || path.ends_with(".tf.json") {
            return Some(IacLanguage::Terraform);
        }
        if path.ends_with(".bicep") {
            return Some(IacLanguage::Bicep);
        }
        if path.starts_with("br:") || path.starts_with("br/") {
            return Some(IacLanguage::Bicep);
        }
        if path.contains("terraform") {
            return Some(IacLanguage::Terraform);
        }
        if path.contains("/bicep") {
            return Some(IacLanguage::Bicep);
        }
        None
    }
}

impl fmt::Display for IacLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IacLanguage::Terraform => write!(f, "terraform"),
            IacLanguage::Bicep => write!(f, "bicep"),
        }
    }
}

impl FromStr for IacLanguage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terraform" | "tf" => Ok(IacLanguage::Terraform),
            "bicep" => Ok(IacLanguage::Bicep),
            other => Err(Error::ParseError(format!("unknown IaC language: {other}"))),
        }
    }
}

/// Where a candidate recipe came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum SourceKind {
    /// Already present in the project's infrastructure files
    LocalScan,
    /// Curated catalog for a target platform
    Catalog(CloudProvider),
    /// Synthesized from the built-in pattern library
    Generated,
    Unknown,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::LocalScan => write!(f, "local"),
            SourceKind::Catalog(provider) => write!(f, "catalog ({})", provider),
            SourceKind::Generated => write!(f, "generated"),
            SourceKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A candidate provisioning module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_kind: SourceKind,
    /// Path, URL or registry reference
    pub source_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, source_kind: SourceKind, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            source_kind,
            source_location: location.into(),
            version: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// IaC dialect inferred from the source location
    pub fn language(&self) -> Option<IacLanguage> {
        IacLanguage::from_location(&self.source_location)
    }
}

/// One scored candidate recipe for one dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMatch {
    pub dependency_id: String,
    pub recipe: Recipe,
    /// Match quality in `[0, 1]`
    pub score: f64,
    /// Never empty for a returned match
    pub match_reasons: Vec<String>,
    /// Name of the source that produced the candidate
    pub source: String,
    /// Tie-break position of the source (lower wins)
    #[serde(default)]
    pub registry_position: usize,
}

impl RecipeMatch {
    /// Score rendered as a whole percentage
    pub fn score_percent(&self) -> u32 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Resolution policy applied by the matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    /// Candidates below this confidence are discarded
    pub min_confidence: f64,
    /// Maximum matches kept per resource type (at least 1)
    pub max_matches: usize,
    /// Source names that win ties ahead of registry order, in this order
    pub preferred_sources: Vec<String>,
    /// Platform of the target environment
    pub cloud_provider: CloudProvider,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_matches: 3,
            preferred_sources: Vec::new(),
            cloud_provider: CloudProvider::Unknown,
        }
    }
}
