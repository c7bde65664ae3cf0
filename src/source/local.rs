// src/source/local.rs

//! Local infrastructure scan
//!
//! Looks for recipes the project already has: entries in a `recipes.yaml`
//! index, Terraform and Bicep `module` declarations, and bare `resource`
//! blocks whose type or name matches the requested resource type. These
//! represent developer intent and carry the highest confidence.

use super::{Candidate, QueryContext, RecipeSource};
use crate::error::{Error, Result};
use crate::practices::is_skipped_dir;
use crate::types::{Recipe, ResourceType, ResourceTypeMapping, SourceKind};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

const INDEX_CONFIDENCE: f64 = 0.95;
const MODULE_CONFIDENCE: f64 = 0.8;
const RESOURCE_CONFIDENCE: f64 = 0.7;

/// Index file locations relative to the project root
const INDEX_FILES: &[&str] = &["recipes.yaml", "recipes/recipes.yaml"];

static TF_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*module\s+"([^"]+)"\s*\{"#).expect("valid regex"));
static TF_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*resource\s+"([^"]+)"\s+"([^"]+)"\s*\{"#).expect("valid regex")
});
static BICEP_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*module\s+(\w+)\s+'([^']+)'").expect("valid regex"));
static BICEP_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*resource\s+(\w+)\s+'([^'@]+)@[^']*'").expect("valid regex")
});

/// Keywords identifying well-known resource types in IaC identifiers
const KNOWN_KEYWORDS: &[(&str, &[&str])] = &[
    ("rediscaches", &["redis"]),
    ("postgresqldatabases", &["postgres"]),
    ("mysqldatabases", &["mysql"]),
    ("sqldatabases", &["sql"]),
    ("mongodatabases", &["mongo", "cosmos"]),
    ("rabbitmqqueues", &["rabbitmq", "servicebus"]),
    ("secrets", &["keyvault", "secret"]),
    ("secretstores", &["keyvault", "secret"]),
    ("statestores", &["storageaccount", "statestore"]),
    ("pubsubbrokers", &["servicebus", "pubsub"]),
];

/// `recipes.yaml` index format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeIndex {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub recipes: Vec<RecipeIndexEntry>,
}

/// One recipe declared in an index file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIndexEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resource_type: String,
    pub path: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Source scanning a project's existing infrastructure files
pub struct LocalScanSource {
    name: String,
    root: PathBuf,
}

impl LocalScanSource {
    /// Create a source rooted at `root`, which must be an existing directory
    pub fn new(name: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::ConfigError(format!(
                "local source '{}' path is not a directory: {}",
                name,
                root.display()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            root,
        })
    }

    /// Project root being scanned
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl RecipeSource for LocalScanSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LocalScan
    }

    async fn query(
        &self,
        ctx: &QueryContext,
        mapping: &ResourceTypeMapping,
    ) -> Result<Vec<Candidate>> {
        let root = self.root.clone();
        let resource_type = mapping.resource_type.clone();
        let cancel = ctx.cancel.clone();

        tokio::task::spawn_blocking(move || scan_project(&root, &resource_type, &cancel))
            .await
            .map_err(|e| Error::source_unavailable(&self.name, format!("scan task failed: {e}")))?
            .map_err(|e| match e {
                Error::Canceled => Error::Canceled,
                other => Error::source_unavailable(&self.name, other.to_string()),
            })
    }
}

/// Scan `root` for recipes satisfying `resource_type`
fn scan_project(
    root: &Path,
    resource_type: &ResourceType,
    cancel: &CancellationToken,
) -> Result<Vec<Candidate>> {
    if !root.is_dir() {
        return Err(Error::IoError(format!(
            "project root no longer exists: {}",
            root.display()
        )));
    }

    let mut candidates = scan_indexes(root, resource_type)?;
    let keywords = keywords_for(resource_type);
    if keywords.is_empty() {
        return Ok(candidates);
    }

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if !matches!(ext, Some("tf") | Some("bicep")) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping unreadable IaC file {}: {}", path.display(), e);
                continue;
            }
        };

        let rel = relative(root, path);
        match ext {
            Some("tf") => candidates.extend(scan_terraform(&content, &rel, resource_type, &keywords)),
            _ => candidates.extend(scan_bicep(&content, &rel, resource_type, &keywords)),
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert((c.recipe.name.clone(), c.recipe.source_location.clone())));
    Ok(candidates)
}

fn scan_indexes(root: &Path, resource_type: &ResourceType) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for index_file in INDEX_FILES {
        let index_path = root.join(index_file);
        if !index_path.is_file() {
            continue;
        }

        let content = std::fs::read_to_string(&index_path).map_err(|e| {
            Error::IoError(format!("failed to read {}: {e}", index_path.display()))
        })?;
        let index: RecipeIndex = match serde_yaml::from_str(&content) {
            Ok(index) => index,
            Err(e) => {
                warn!("Ignoring malformed recipe index {}: {}", index_path.display(), e);
                continue;
            }
        };

        let index_dir = index_path.parent().unwrap_or(root);
        for entry in index.recipes {
            if entry.resource_type != resource_type.name {
                continue;
            }
            let location = relative(root, &index_dir.join(&entry.path));
            let mut recipe = Recipe::new(&entry.name, SourceKind::LocalScan, location)
                .with_description(entry.description);
            recipe.version = entry.version;

            candidates.push(Candidate::new(
                recipe,
                INDEX_CONFIDENCE,
                format!("declared for {} in {}", resource_type.name, index_file),
            ));
        }
    }

    Ok(candidates)
}

fn scan_terraform(
    content: &str,
    rel: &str,
    resource_type: &ResourceType,
    keywords: &[String],
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for caps in TF_MODULE.captures_iter(content) {
        let module = &caps[1];
        if identifier_matches(module, keywords) {
            candidates.push(Candidate::new(
                Recipe::new(module, SourceKind::LocalScan, rel)
                    .with_description(format!("Terraform module '{}' in {}", module, rel)),
                MODULE_CONFIDENCE,
                format!("terraform module '{}' matches {}", module, resource_type.name),
            ));
        }
    }

    for caps in TF_RESOURCE.captures_iter(content) {
        let (kind, name) = (&caps[1], &caps[2]);
        if identifier_matches(kind, keywords) || identifier_matches(name, keywords) {
            candidates.push(Candidate::new(
                Recipe::new(name, SourceKind::LocalScan, rel)
                    .with_description(format!("Terraform resource {}.{} in {}", kind, name, rel)),
                RESOURCE_CONFIDENCE,
                format!("terraform resource '{}' matches {}", kind, resource_type.name),
            ));
        }
    }

    candidates
}

fn scan_bicep(
    content: &str,
    rel: &str,
    resource_type: &ResourceType,
    keywords: &[String],
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for caps in BICEP_MODULE.captures_iter(content) {
        let (symbol, target) = (&caps[1], &caps[2]);
        if !(identifier_matches(symbol, keywords) || identifier_matches(target, keywords)) {
            continue;
        }
        let location = if target.starts_with("./") || target.starts_with("../") {
            let base = Path::new(rel).parent().unwrap_or(Path::new(""));
            normalize(&base.join(target))
        } else {
            target.to_string()
        };
        candidates.push(Candidate::new(
            Recipe::new(symbol, SourceKind::LocalScan, location)
                .with_description(format!("Bicep module '{}' in {}", symbol, rel)),
            MODULE_CONFIDENCE,
            format!("bicep module '{}' matches {}", symbol, resource_type.name),
        ));
    }

    for caps in BICEP_RESOURCE.captures_iter(content) {
        let (symbol, arm_type) = (&caps[1], &caps[2]);
        if identifier_matches(arm_type, keywords) || identifier_matches(symbol, keywords) {
            candidates.push(Candidate::new(
                Recipe::new(symbol, SourceKind::LocalScan, rel)
                    .with_description(format!("Bicep resource {} ({}) in {}", symbol, arm_type, rel)),
                RESOURCE_CONFIDENCE,
                format!("bicep resource '{}' matches {}", arm_type, resource_type.name),
            ));
        }
    }

    candidates
}

/// Keywords to look for in IaC identifiers for a resource type
fn keywords_for(resource_type: &ResourceType) -> Vec<String> {
    let Some(type_name) = resource_type.type_name() else {
        return Vec::new();
    };
    let lower = type_name.to_lowercase();

    if let Some((_, keywords)) = KNOWN_KEYWORDS.iter().find(|(name, _)| *name == lower) {
        return keywords.iter().map(|k| k.to_string()).collect();
    }

    // Leading camel-case word, singular: "messageQueues" -> "message"
    let first: String = type_name
        .chars()
        .enumerate()
        .take_while(|(i, c)| *i == 0 || !c.is_uppercase())
        .map(|(_, c)| c.to_ascii_lowercase())
        .collect();
    let first = first.strip_suffix('s').unwrap_or(&first).to_string();

    if first.len() >= 3 { vec![first] } else { Vec::new() }
}

fn identifier_matches(identifier: &str, keywords: &[String]) -> bool {
    let squashed: String = identifier
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect();
    keywords.iter().any(|k| squashed.contains(k.as_str()))
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    normalize(rel)
}

fn normalize(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if parts.pop().is_none() {
                    parts.push("..".to_string());
                }
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn redis() -> ResourceTypeMapping {
        ResourceTypeMapping::new(
            "redis-1",
            ResourceType::new("Radius.Data/redisCaches", "2025-08-01-preview"),
        )
    }

    #[test]
    fn test_keywords_for_known_and_derived_types() {
        assert_eq!(keywords_for(&redis().resource_type), vec!["redis"]);
        let queues = ResourceType::new("Acme.Messaging/messageQueues", "");
        assert_eq!(keywords_for(&queues), vec!["message"]);
        let short = ResourceType::new("Acme.X/ab", "");
        assert!(keywords_for(&short).is_empty());
    }

    #[test]
    fn test_identifier_matches_ignores_separators() {
        let keywords = vec!["keyvault".to_string()];
        assert!(identifier_matches("azurerm_key_vault", &keywords));
        assert!(identifier_matches("Microsoft.KeyVault/vaults", &keywords));
        assert!(!identifier_matches("azurerm_storage_account", &keywords));
    }

    #[test]
    fn test_normalize_relative_module_path() {
        assert_eq!(normalize(Path::new("infra/./modules/../redis.bicep")), "infra/redis.bicep");
    }

    #[tokio::test]
    async fn test_scan_finds_terraform_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("infra")).unwrap();
        fs::write(
            dir.path().join("infra/main.tf"),
            "module \"redis_cache\" {\n  source = \"./modules/redis\"\n}\n\nresource \"azurerm_storage_account\" \"sa\" {\n}\n",
        )
        .unwrap();

        let source = LocalScanSource::new("local", dir.path()).unwrap();
        let candidates = source.query(&QueryContext::default(), &redis()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].recipe.name, "redis_cache");
        assert_eq!(candidates[0].recipe.source_location, "infra/main.tf");
        assert_eq!(candidates[0].recipe.source_kind, SourceKind::LocalScan);
        assert_eq!(candidates[0].confidence, MODULE_CONFIDENCE);
        assert!(!candidates[0].reasons.is_empty());
    }

    #[tokio::test]
    async fn test_scan_finds_bicep_module_and_resource() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("infra/modules")).unwrap();
        fs::write(
            dir.path().join("infra/main.bicep"),
            "module cache './modules/redis.bicep' = {\n  name: 'cache'\n}\n\nresource redisCache 'Microsoft.Cache/redis@2023-08-01' = {\n}\n",
        )
        .unwrap();

        let source = LocalScanSource::new("local", dir.path()).unwrap();
        let candidates = source.query(&QueryContext::default(), &redis()).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].recipe.source_location, "infra/modules/redis.bicep");
        assert_eq!(candidates[0].confidence, MODULE_CONFIDENCE);
        assert_eq!(candidates[1].recipe.name, "redisCache");
        assert_eq!(candidates[1].confidence, RESOURCE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_index_entries_come_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("recipes.yaml"),
            "version: \"1\"\nrecipes:\n  - name: team-redis\n    resourceType: Radius.Data/redisCaches\n    path: recipes/redis/main.tf\n    version: \"1.2.0\"\n  - name: team-pg\n    resourceType: Radius.Data/postgreSqlDatabases\n    path: recipes/pg/main.tf\n",
        )
        .unwrap();
        fs::write(dir.path().join("cache.tf"), "module \"redis\" {\n}\n").unwrap();

        let source = LocalScanSource::new("local", dir.path()).unwrap();
        let candidates = source.query(&QueryContext::default(), &redis()).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].recipe.name, "team-redis");
        assert_eq!(candidates[0].recipe.source_location, "recipes/redis/main.tf");
        assert_eq!(candidates[0].recipe.version.as_deref(), Some("1.2.0"));
        assert_eq!(candidates[0].confidence, INDEX_CONFIDENCE);
        assert_eq!(candidates[1].recipe.name, "redis");
    }

    #[tokio::test]
    async fn test_empty_project_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalScanSource::new("local", dir.path()).unwrap();
        let candidates = source.query(&QueryContext::default(), &redis()).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_missing_root_fails_construction() {
        let result = LocalScanSource::new("local", "/definitely/not/a/real/path");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_removed_root_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        let source = LocalScanSource::new("local", &root).unwrap();
        fs::remove_dir_all(&root).unwrap();

        let err = source.query(&QueryContext::default(), &redis()).await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { ref source_name, .. } if source_name == "local"));
    }
}
