// src/source/generated.rs

//! Recipes synthesized from the built-in pattern library
//!
//! The library maps resource types to generators. A generator picks the
//! idiomatic module for the active platform: an Azure Verified Module on
//! Azure, a community Terraform module on AWS, and a generated Kubernetes
//! Bicep template everywhere else. Generated recipes are a last resort and
//! score low.

use super::{Candidate, QueryContext, RecipeSource};
use crate::error::Result;
use crate::types::{CloudProvider, Recipe, ResourceType, ResourceTypeMapping, SourceKind};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const GENERATED_CONFIDENCE: f64 = 0.3;
const AVM_CONFIDENCE: f64 = 0.45;

/// Produces a recipe for a resource type on a platform
pub trait RecipeGenerator: Send + Sync {
    fn generate(&self, resource_type: &ResourceType, provider: CloudProvider) -> Option<Candidate>;
}

/// Azure Verified Module reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvmModule {
    pub path: String,
    pub version: String,
}

/// Table-driven generator for one resource type
#[derive(Debug, Clone, Default)]
pub struct PatternGenerator {
    /// Short recipe name stem; derived from the type name when absent
    slug: Option<String>,
    azure: Option<AvmModule>,
    /// Module name under `terraform-aws-modules`
    aws: Option<String>,
}

impl PatternGenerator {
    /// Generator that only emits Kubernetes templates, named after the type
    pub fn derived() -> Self {
        Self::default()
    }

    pub fn new(slug: &str) -> Self {
        Self {
            slug: Some(slug.to_string()),
            ..Self::default()
        }
    }

    pub fn with_avm(mut self, path: &str, version: &str) -> Self {
        self.azure = Some(AvmModule {
            path: path.to_string(),
            version: version.to_string(),
        });
        self
    }

    fn with_slug(mut self, slug: &str) -> Self {
        self.slug = Some(slug.to_string());
        self
    }

    pub fn with_aws_module(mut self, module: &str) -> Self {
        self.aws = Some(module.to_string());
        self
    }

    fn slug_for(&self, resource_type: &ResourceType) -> String {
        match &self.slug {
            Some(slug) => slug.clone(),
            None => resource_type
                .type_name()
                .unwrap_or(&resource_type.name)
                .to_lowercase(),
        }
    }
}

impl RecipeGenerator for PatternGenerator {
    fn generate(&self, resource_type: &ResourceType, provider: CloudProvider) -> Option<Candidate> {
        let slug = self.slug_for(resource_type);

        match (provider, &self.azure, &self.aws) {
            (CloudProvider::Azure, Some(avm), _) => {
                let recipe = Recipe::new(
                    format!("azure-{}", slug),
                    SourceKind::Generated,
                    format!("br/public:{}:{}", avm.path, avm.version),
                )
                .with_description(format!("Azure Verified Module {} for {}", avm.path, resource_type))
                .with_version(&avm.version);
                Some(
                    Candidate::new(recipe, AVM_CONFIDENCE, format!("generated from pattern for {}", resource_type))
                        .with_reason(format!("azure verified module {}", avm.path)),
                )
            }
            (CloudProvider::Aws, _, Some(module)) => {
                let recipe = Recipe::new(
                    format!("aws-{}", slug),
                    SourceKind::Generated,
                    format!("registry.terraform.io/terraform-aws-modules/{}/aws", module),
                )
                .with_description(format!("Community Terraform module {} for {}", module, resource_type));
                Some(
                    Candidate::new(recipe, GENERATED_CONFIDENCE, format!("generated from pattern for {}", resource_type))
                        .with_reason(format!("terraform-aws-modules/{}", module)),
                )
            }
            _ => {
                let (category, type_name) = match (resource_type.category(), resource_type.type_name()) {
                    (Some(category), Some(type_name)) => (category.to_lowercase(), type_name),
                    _ => return None,
                };
                let recipe = Recipe::new(
                    format!("{}-generated", slug),
                    SourceKind::Generated,
                    format!("generated://kubernetes/{}/{}.bicep", category, type_name),
                )
                .with_description(format!("Generated Kubernetes template for {}", resource_type));
                Some(Candidate::new(
                    recipe,
                    GENERATED_CONFIDENCE,
                    format!("generated from pattern for {}", resource_type),
                ))
            }
        }
    }
}

/// Resource type to generator table
#[derive(Clone, Default)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, Arc<dyn RecipeGenerator>>,
    fallback: Option<Arc<dyn RecipeGenerator>>,
}

impl PatternLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the built-in patterns
    pub fn builtin() -> Self {
        let mut library = Self::new();

        let redis = PatternGenerator::new("redis")
            .with_avm("avm/res/cache/redis", "0.3.0")
            .with_aws_module("elasticache");
        let sql = PatternGenerator::new("sql")
            .with_avm("avm/res/sql/server", "0.4.0")
            .with_aws_module("rds");
        let mongo = PatternGenerator::new("mongodb")
            .with_avm("avm/res/document-db/database-account", "0.5.0");
        let messaging = PatternGenerator::new("servicebus")
            .with_avm("avm/res/service-bus/namespace", "0.4.0");
        let secrets = PatternGenerator::new("secrets")
            .with_avm("avm/res/key-vault/vault", "0.6.0")
            .with_aws_module("secrets-manager");

        library.register("Radius.Data/redisCaches", redis.clone());
        library.register("Radius.Data/mySqlDatabases", sql.clone().with_slug("mysql"));
        library.register(
            "Radius.Data/postgreSqlDatabases",
            PatternGenerator::new("postgresql").with_aws_module("rds"),
        );
        library.register("Radius.Data/mongoDatabases", mongo.clone());
        library.register("Radius.Messaging/rabbitMQQueues", messaging.clone().with_slug("rabbitmq"));
        library.register("Radius.Security/secrets", secrets.clone());
        library.register("Radius.Compute/containers", PatternGenerator::new("containers"));

        // Legacy Applications.* names
        library.register("Applications.Datastores/redisCaches", redis);
        library.register("Applications.Datastores/sqlDatabases", sql);
        library.register("Applications.Datastores/mongoDatabases", mongo);
        library.register("Applications.Messaging/rabbitMQQueues", messaging.clone().with_slug("rabbitmq"));
        library.register("Applications.Dapr/pubSubBrokers", messaging.with_slug("pubsub"));
        library.register("Applications.Dapr/stateStores", PatternGenerator::new("statestore"));
        library.register("Applications.Dapr/secretStores", secrets.with_slug("secretstore"));

        library
    }

    /// Register a generator for a resource type, replacing any previous one
    pub fn register(&mut self, resource_type: &str, generator: impl RecipeGenerator + 'static) {
        self.patterns.insert(resource_type.to_string(), Arc::new(generator));
    }

    /// Generator used for resource types with no registered pattern
    pub fn with_fallback(mut self, generator: impl RecipeGenerator + 'static) -> Self {
        self.fallback = Some(Arc::new(generator));
        self
    }

    /// Generator for a resource type, falling back if one is configured
    pub fn lookup(&self, resource_type: &str) -> Option<&Arc<dyn RecipeGenerator>> {
        self.patterns.get(resource_type).or(self.fallback.as_ref())
    }

    /// Resource types with a registered pattern
    pub fn resource_types(&self) -> Vec<&str> {
        self.patterns.keys().map(String::as_str).collect()
    }
}

/// Source synthesizing recipes from a [`PatternLibrary`]
pub struct GeneratedSource {
    name: String,
    library: PatternLibrary,
}

impl GeneratedSource {
    pub fn new(name: &str, library: PatternLibrary) -> Self {
        Self {
            name: name.to_string(),
            library,
        }
    }
}

#[async_trait]
impl RecipeSource for GeneratedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Generated
    }

    async fn query(
        &self,
        ctx: &QueryContext,
        mapping: &ResourceTypeMapping,
    ) -> Result<Vec<Candidate>> {
        ctx.check_canceled()?;

        let Some(generator) = self.library.lookup(&mapping.resource_type.name) else {
            debug!("No pattern for {}", mapping.resource_type);
            return Ok(Vec::new());
        };

        Ok(generator
            .generate(&mapping.resource_type, ctx.cloud_provider)
            .into_iter()
            .collect())
    }
}
