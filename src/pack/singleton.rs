// src/pack/singleton.rs

//! Built-in single-recipe packs for core resource types
//!
//! Every core resource type needs some recipe. When no registered pack
//! covers one, a pack named after the type is created holding its default
//! Kubernetes recipe. Creation is checked against the store first, so
//! repeated runs converge without rewriting anything.

use super::{PackClient, PackId, RecipeDefinition, RecipeKind, RecipePackProperties};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A core resource type and its default recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingletonDefinition {
    /// Pack name
    pub name: &'static str,
    pub resource_type: &'static str,
    pub recipe_location: &'static str,
}

/// Core resource types that always get a recipe
pub const SINGLETON_DEFINITIONS: &[SingletonDefinition] = &[
    SingletonDefinition {
        name: "containers",
        resource_type: "Radius.Compute/containers",
        recipe_location: "ghcr.io/radius-project/kube-recipes/containers@latest",
    },
    SingletonDefinition {
        name: "persistentvolumes",
        resource_type: "Radius.Compute/persistentVolumes",
        recipe_location: "ghcr.io/radius-project/kube-recipes/persistentvolumes@latest",
    },
    SingletonDefinition {
        name: "routes",
        resource_type: "Radius.Compute/routes",
        recipe_location: "ghcr.io/radius-project/kube-recipes/routes@latest",
    },
    SingletonDefinition {
        name: "secrets",
        resource_type: "Radius.Security/secrets",
        recipe_location: "ghcr.io/radius-project/kube-recipes/secrets@latest",
    },
];

/// Pack holding exactly the definition's recipe
pub fn singleton_pack(definition: &SingletonDefinition) -> RecipePackProperties {
    RecipePackProperties::new().with_recipe(
        definition.resource_type,
        RecipeDefinition::new(RecipeKind::Bicep, definition.recipe_location),
    )
}

/// Outcome of ensuring singleton coverage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
    /// IDs of packs created by this call
    pub created: Vec<String>,
    /// IDs of singleton packs that were already in the store
    pub existing: Vec<String>,
    /// Resource type to owning pack after the call
    pub coverage: BTreeMap<String, String>,
}

impl EnsureReport {
    /// Singleton pack IDs to reference from the environment
    pub fn pack_ids(&self) -> Vec<String> {
        self.existing.iter().chain(&self.created).cloned().collect()
    }
}

/// Create a singleton pack in `scope` for every core type not in `covered`
///
/// A singleton that already exists with its recipe is reused rather than
/// rewritten, so a second call with the same input creates nothing and
/// reports the same coverage.
pub async fn ensure_missing_singletons(
    client: &dyn PackClient,
    scope: &str,
    covered: &BTreeMap<String, String>,
) -> Result<EnsureReport> {
    let mut report = EnsureReport {
        coverage: covered.clone(),
        ..EnsureReport::default()
    };

    for definition in SINGLETON_DEFINITIONS {
        if covered.contains_key(definition.resource_type) {
            debug!(
                "{} already covered by pack '{}'",
                definition.resource_type, covered[definition.resource_type]
            );
            continue;
        }

        let id = PackId::new(scope, definition.name).to_string();
        let wanted = singleton_pack(definition);

        let existing = client.get(definition.name).await.map_err(|e| match e {
            Error::PackFetchFailed { .. } => e,
            other => Error::PackFetchFailed {
                pack: id.clone(),
                reason: other.to_string(),
            },
        })?;

        let current = existing
            .as_ref()
            .and_then(|props| props.recipes.get(definition.resource_type));
        if current.is_some() {
            debug!("Singleton pack {} already present", id);
            report.existing.push(id);
        } else {
            client
                .create_or_update(definition.name, &wanted)
                .await
                .map_err(|e| match e {
                    Error::PackWriteFailed { .. } => e,
                    other => Error::PackWriteFailed {
                        pack: id.clone(),
                        reason: other.to_string(),
                    },
                })?;
            info!("Created recipe pack {}", id);
            report.created.push(id);
        }

        report
            .coverage
            .insert(definition.resource_type.to_string(), definition.name.to_string());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PACK_SCOPE;
    use crate::pack::InMemoryPackClient;

    fn id(name: &str) -> String {
        format!("{DEFAULT_PACK_SCOPE}/providers/Radius.Core/recipePacks/{name}")
    }

    #[test]
    fn test_singleton_definitions() {
        assert_eq!(SINGLETON_DEFINITIONS.len(), 4);
        for definition in SINGLETON_DEFINITIONS {
            assert!(!definition.recipe_location.is_empty());
            let pack = singleton_pack(definition);
            assert_eq!(pack.recipes.len(), 1);
            assert_eq!(pack.recipes[definition.resource_type].recipe_kind, RecipeKind::Bicep);
        }
    }

    #[tokio::test]
    async fn test_creates_all_when_nothing_covered() {
        let client = InMemoryPackClient::new();
        let report = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(report.created.len(), 4);
        for definition in SINGLETON_DEFINITIONS {
            assert!(report.created.contains(&id(definition.name)));
            assert_eq!(report.coverage[definition.resource_type], definition.name);
        }
        assert_eq!(client.write_count(), 4);
    }

    #[tokio::test]
    async fn test_skips_covered_types() {
        let client = InMemoryPackClient::new();
        let mut covered = BTreeMap::new();
        covered.insert("Radius.Compute/containers".to_string(), "my-containers-pack".to_string());
        covered.insert("Radius.Security/secrets".to_string(), "my-secrets-pack".to_string());

        let report = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
            .await
            .unwrap();

        assert_eq!(report.created, vec![id("persistentvolumes"), id("routes")]);
        assert_eq!(report.coverage["Radius.Compute/containers"], "my-containers-pack");
    }

    #[tokio::test]
    async fn test_nothing_created_when_all_covered() {
        let client = InMemoryPackClient::new();
        let covered: BTreeMap<String, String> = SINGLETON_DEFINITIONS
            .iter()
            .map(|d| (d.resource_type.to_string(), "other".to_string()))
            .collect();

        let report = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
            .await
            .unwrap();
        assert!(report.created.is_empty());
        assert!(report.pack_ids().is_empty());
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_second_call_is_idempotent() {
        let client = InMemoryPackClient::new();
        let covered = BTreeMap::new();

        let first = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
            .await
            .unwrap();
        let second = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
            .await
            .unwrap();

        assert!(second.created.is_empty());
        assert_eq!(second.existing, first.created);
        assert_eq!(second.coverage, first.coverage);
        assert_eq!(client.write_count(), 4);
    }
}
