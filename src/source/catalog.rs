// src/source/catalog.rs

//! Curated recipe catalog for one target platform
//!
//! The catalog is laid out as
//! `<category>/<type>/recipes/<provider>/<bicep|terraform>/<file>`, so a
//! resource type like `Radius.Data/redisCaches` on Kubernetes is looked up
//! under `Data/redisCaches/recipes/kubernetes/`. Two index backends exist:
//! - [`HttpCatalogIndex`]: walks the catalog through a contents API
//! - [`StaticCatalogIndex`]: a fixed table, used offline and in tests

use super::{Candidate, QueryContext, RecipeSource};
use crate::error::{Error, Result};
use crate::types::{CloudProvider, IacLanguage, Recipe, ResourceType, ResourceTypeMapping, SourceKind, parse_resource_type};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Contents API of the public resource type catalog
pub const DEFAULT_CATALOG_API: &str =
    "https://api.github.com/repos/radius-project/resource-types-contrib/contents";

/// Raw file root of the public resource type catalog
pub const DEFAULT_CATALOG_RAW: &str =
    "https://raw.githubusercontent.com/radius-project/resource-types-contrib/main";

const CATALOG_CONFIDENCE: f64 = 0.6;

/// One recipe published in a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub language: IacLanguage,
    /// Fetchable location of the template
    pub location: String,
    pub description: String,
}

/// Lookup of catalog recipes by platform and resource type
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Recipes published for `resource_type` on `provider`
    ///
    /// A resource type the catalog does not know yields an empty list.
    async fn lookup(
        &self,
        provider: CloudProvider,
        resource_type: &ResourceType,
    ) -> Result<Vec<CatalogEntry>>;
}

/// Build the raw URL of a catalog template
fn template_url(
    raw_base: &str,
    category: &str,
    type_name: &str,
    provider: CloudProvider,
    language: IacLanguage,
    file: &str,
) -> String {
    format!(
        "{}/{}/{}/recipes/{}/{}/{}",
        raw_base.trim_end_matches('/'),
        category,
        type_name,
        provider,
        language,
        file
    )
}

/// Recipe name for a template file, `None` if the file is not a template
/// of the given dialect
fn template_name(file: &str, language: IacLanguage) -> Option<&str> {
    match language {
        IacLanguage::Bicep => file.strip_suffix(".bicep"),
        IacLanguage::Terraform => file.strip_suffix(".tf"),
    }
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Catalog index backed by a contents API over HTTP
pub struct HttpCatalogIndex {
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
}

impl HttpCatalogIndex {
    /// Create an index reading from `api_base` and linking templates under `raw_base`
    pub fn new(api_base: &str, raw_base: &str, timeout: Duration) -> Result<Self> {
        for base in [api_base, raw_base] {
            url::Url::parse(base)
                .map_err(|e| Error::ConfigError(format!("invalid catalog URL '{}': {e}", base)))?;
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("recipe-engine/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
        })
    }

    /// List a catalog directory; a missing directory is an empty listing
    async fn list(&self, path: &str) -> Result<Vec<ContentItem>> {
        let url = format!("{}/{}", self.api_base, path);
        debug!("Listing catalog directory: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::IoError(format!("Failed to list {}: {e}", url)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Error::IoError(format!(
                "Catalog listing {} returned HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .json::<Vec<ContentItem>>()
            .await
            .map_err(|e| Error::ParseError(format!("Invalid catalog listing {}: {e}", url)))
    }
}

#[async_trait]
impl CatalogIndex for HttpCatalogIndex {
    async fn lookup(
        &self,
        provider: CloudProvider,
        resource_type: &ResourceType,
    ) -> Result<Vec<CatalogEntry>> {
        let Some((category, type_name)) = parse_resource_type(&resource_type.name) else {
            return Ok(Vec::new());
        };

        let base = format!("{}/{}/recipes/{}", category, type_name, provider);
        let mut entries = Vec::new();

        for dir in self.list(&base).await? {
            if dir.kind != "dir" {
                continue;
            }
            let Ok(language) = dir.name.parse::<IacLanguage>() else {
                continue;
            };

            for file in self.list(&format!("{}/{}", base, dir.name)).await? {
                if file.kind != "file" {
                    continue;
                }
                let Some(name) = template_name(&file.name, language) else {
                    continue;
                };
                entries.push(CatalogEntry {
                    name: name.to_string(),
                    language,
                    location: template_url(
                        &self.raw_base,
                        category,
                        type_name,
                        provider,
                        language,
                        &file.name,
                    ),
                    description: format!("{} recipe for {} on {}", language, type_name, provider),
                });
            }
        }

        Ok(entries)
    }
}

/// Catalog index over a fixed table
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogIndex {
    entries: BTreeMap<(CloudProvider, String), Vec<CatalogEntry>>,
}

impl StaticCatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index preloaded with recipes known to exist in the public catalog
    pub fn with_builtins() -> Self {
        let mut index = Self::new();
        let known: &[(&str, CloudProvider, IacLanguage, &str)] = &[
            ("Radius.Data/mySqlDatabases", CloudProvider::Kubernetes, IacLanguage::Bicep, "kubernetes-mysql.bicep"),
            ("Radius.Data/postgreSqlDatabases", CloudProvider::Kubernetes, IacLanguage::Bicep, "kubernetes-postgresql.bicep"),
            ("Radius.Data/redisCaches", CloudProvider::Kubernetes, IacLanguage::Bicep, "kubernetes-redis.bicep"),
            ("Radius.Data/mongoDatabases", CloudProvider::Kubernetes, IacLanguage::Bicep, "kubernetes-mongodb.bicep"),
            ("Radius.Security/secrets", CloudProvider::Kubernetes, IacLanguage::Bicep, "kubernetes-secrets.bicep"),
        ];

        for (resource_type, provider, language, file) in known {
            let Some((category, type_name)) = parse_resource_type(resource_type) else {
                continue;
            };
            let Some(name) = template_name(file, *language) else {
                continue;
            };
            index.insert(
                *provider,
                resource_type,
                CatalogEntry {
                    name: name.to_string(),
                    language: *language,
                    location: template_url(DEFAULT_CATALOG_RAW, category, type_name, *provider, *language, file),
                    description: format!("{} recipe for {} on {}", language, type_name, provider),
                },
            );
        }
        index
    }

    /// Add an entry for a provider and resource type
    pub fn insert(&mut self, provider: CloudProvider, resource_type: &str, entry: CatalogEntry) {
        self.entries
            .entry((provider, resource_type.to_string()))
            .or_default()
            .push(entry);
    }
}

#[async_trait]
impl CatalogIndex for StaticCatalogIndex {
    async fn lookup(
        &self,
        provider: CloudProvider,
        resource_type: &ResourceType,
    ) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .get(&(provider, resource_type.name.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Source offering curated recipes for one platform
pub struct CatalogSource {
    name: String,
    provider: CloudProvider,
    index: Arc<dyn CatalogIndex>,
}

impl CatalogSource {
    pub fn new(name: &str, provider: CloudProvider, index: Arc<dyn CatalogIndex>) -> Self {
        Self {
            name: name.to_string(),
            provider,
            index,
        }
    }

    pub fn provider(&self) -> CloudProvider {
        self.provider
    }
}

#[async_trait]
impl RecipeSource for CatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Catalog(self.provider)
    }

    async fn query(
        &self,
        ctx: &QueryContext,
        mapping: &ResourceTypeMapping,
    ) -> Result<Vec<Candidate>> {
        ctx.check_canceled()?;

        let looked_up = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Error::Canceled),
            result = self.index.lookup(self.provider, &mapping.resource_type) => result,
        };
        let entries =
            looked_up.map_err(|e| Error::source_unavailable(&self.name, e.to_string()))?;

        debug!(
            "Catalog '{}' has {} recipe(s) for {}",
            self.name,
            entries.len(),
            mapping.resource_type
        );

        Ok(entries
            .into_iter()
            .map(|entry| {
                let recipe = Recipe::new(entry.name, SourceKind::Catalog(self.provider), entry.location)
                    .with_description(entry.description);
                Candidate::new(
                    recipe,
                    CATALOG_CONFIDENCE,
                    format!(
                        "curated {} recipe for {} in {} catalog",
                        entry.language, mapping.resource_type, self.name
                    ),
                )
                .with_reason(format!("targets {}", self.provider))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingIndex;

    #[async_trait]
    impl CatalogIndex for FailingIndex {
        async fn lookup(&self, _: CloudProvider, _: &ResourceType) -> Result<Vec<CatalogEntry>> {
            Err(Error::IoError("connection refused".to_string()))
        }
    }

    fn mapping(name: &str) -> ResourceTypeMapping {
        ResourceTypeMapping::new("dep-1", ResourceType::new(name, "2025-08-01-preview"))
    }

    #[test]
    fn test_template_url_layout() {
        let url = template_url(
            DEFAULT_CATALOG_RAW,
            "Data",
            "mySqlDatabases",
            CloudProvider::Kubernetes,
            IacLanguage::Bicep,
            "kubernetes-mysql.bicep",
        );
        assert_eq!(
            url,
            "https://raw.githubusercontent.com/radius-project/resource-types-contrib/main/Data/mySqlDatabases/recipes/kubernetes/bicep/kubernetes-mysql.bicep"
        );
    }

    #[test]
    fn test_template_name_filters_dialect() {
        assert_eq!(template_name("main.tf", IacLanguage::Terraform), Some("main"));
        assert_eq!(template_name("README.md", IacLanguage::Terraform), None);
        assert_eq!(template_name("main.tf", IacLanguage::Bicep), None);
    }

    #[test]
    fn test_http_index_rejects_bad_url() {
        let result = HttpCatalogIndex::new("not a url", DEFAULT_CATALOG_RAW, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_builtin_catalog_candidates() {
        let source = CatalogSource::new(
            "k8s",
            CloudProvider::Kubernetes,
            Arc::new(StaticCatalogIndex::with_builtins()),
        );
        let candidates = source
            .query(&QueryContext::default(), &mapping("Radius.Data/mySqlDatabases"))
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.recipe.name, "kubernetes-mysql");
        assert_eq!(candidate.recipe.source_kind, SourceKind::Catalog(CloudProvider::Kubernetes));
        assert_eq!(candidate.recipe.language(), Some(IacLanguage::Bicep));
        assert_eq!(candidate.confidence, CATALOG_CONFIDENCE);
        assert_eq!(candidate.reasons.len(), 2);
    }

    #[tokio::test]
    async fn test_other_provider_has_no_entries() {
        let source = CatalogSource::new(
            "aws",
            CloudProvider::Aws,
            Arc::new(StaticCatalogIndex::with_builtins()),
        );
        let candidates = source
            .query(&QueryContext::default(), &mapping("Radius.Data/mySqlDatabases"))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_is_source_unavailable() {
        let source = CatalogSource::new("k8s", CloudProvider::Kubernetes, Arc::new(FailingIndex));
        let err = source
            .query(&QueryContext::default(), &mapping("Radius.Data/redisCaches"))
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_canceled_query() {
        let ctx = QueryContext::default();
        ctx.cancel.cancel();
        let source = CatalogSource::new(
            "k8s",
            CloudProvider::Kubernetes,
            Arc::new(StaticCatalogIndex::with_builtins()),
        );
        let err = source
            .query(&ctx, &mapping("Radius.Data/redisCaches"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));
    }
}
