// src/pack/mod.rs

//! Recipe packs
//!
//! A pack is a named, persisted map from resource type to recipe definition,
//! registered into an environment by resource ID:
//! `<scope>/providers/Radius.Core/recipePacks/<name>`.
//!
//! The engine reads packs to find resource types claimed more than once and
//! creates small single-recipe packs for core types nothing covers yet.

mod client;
mod conflict;
mod singleton;

pub use client::{FilePackClient, InMemoryPackClient, PackClient};
pub use conflict::{ConflictDetector, InspectionReport, SkippedPack, format_conflict_error};
pub use singleton::{
    EnsureReport, SINGLETON_DEFINITIONS, SingletonDefinition, ensure_missing_singletons,
    singleton_pack,
};

use crate::error::{Error, Result};
use crate::types::{IacLanguage, Recipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource provider type of recipe packs
pub const PACK_RESOURCE_TYPE: &str = "Radius.Core/recipePacks";

/// Name of the pack resolved recipes are registered into by default
pub const DEFAULT_PACK_NAME: &str = "local-dev";

/// Template dialect of a recipe definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    Bicep,
    Terraform,
}

impl From<IacLanguage> for RecipeKind {
    fn from(language: IacLanguage) -> Self {
        match language {
            IacLanguage::Bicep => RecipeKind::Bicep,
            IacLanguage::Terraform => RecipeKind::Terraform,
        }
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeKind::Bicep => write!(f, "bicep"),
            RecipeKind::Terraform => write!(f, "terraform"),
        }
    }
}

/// One recipe registered in a pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDefinition {
    pub recipe_kind: RecipeKind,
    pub recipe_location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl RecipeDefinition {
    pub fn new(recipe_kind: RecipeKind, recipe_location: impl Into<String>) -> Self {
        Self {
            recipe_kind,
            recipe_location: recipe_location.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Definition for a resolved recipe; locations that do not reveal their
    /// dialect are registered as Bicep
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let kind = recipe.language().map(RecipeKind::from).unwrap_or(RecipeKind::Bicep);
        Self::new(kind, &recipe.source_location)
    }
}

/// Contents of a pack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePackProperties {
    /// Resource type name to recipe
    #[serde(default)]
    pub recipes: BTreeMap<String, RecipeDefinition>,
}

impl RecipePackProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe(mut self, resource_type: &str, definition: RecipeDefinition) -> Self {
        self.recipes.insert(resource_type.to_string(), definition);
        self
    }

    /// Resource types this pack provides a recipe for
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }
}

/// Parsed recipe pack resource ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackId {
    /// Administrative scope, e.g. `/planes/radius/local/resourceGroups/default`
    pub scope: String,
    pub name: String,
}

impl PackId {
    pub fn new(scope: &str, name: &str) -> Self {
        Self {
            scope: scope.trim_end_matches('/').to_string(),
            name: name.to_string(),
        }
    }

    /// Parse `<scope>/providers/Radius.Core/recipePacks/<name>`
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = || Error::InvalidPackId(id.to_string());

        let lower = id.to_ascii_lowercase();
        let split = lower.rfind("/providers/").ok_or_else(invalid)?;
        let scope = &id[..split];
        let rest = &id[split + "/providers/".len()..];

        let mut segments = rest.split('/');
        let (Some(namespace), Some(kind), Some(name), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(invalid());
        };

        let provider_type = format!("{}/{}", namespace, kind);
        if !provider_type.eq_ignore_ascii_case(PACK_RESOURCE_TYPE)
            || name.is_empty()
            || !scope.starts_with('/')
            || scope.len() < 2
        {
            return Err(invalid());
        }

        Ok(Self::new(scope, name))
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/providers/{}/{}", self.scope, PACK_RESOURCE_TYPE, self.name)
    }
}

/// Whether `id` is already in a list of pack IDs (case-insensitive)
pub fn pack_id_exists(ids: &[String], id: &str) -> bool {
    ids.iter().any(|existing| existing.eq_ignore_ascii_case(id))
}

/// Pack IDs referenced by an environment's `recipePacks` property
///
/// Non-string entries are ignored. Returns `None` when the property is
/// missing, not an array, or holds no string IDs.
pub fn extract_pack_ids(properties: Option<&serde_json::Value>) -> Option<Vec<String>> {
    let ids: Vec<String> = properties?
        .get("recipePacks")?
        .as_array()?
        .iter()
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect();

    if ids.is_empty() { None } else { Some(ids) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use serde_json::json;

    const SCOPE: &str = "/planes/radius/local/resourceGroups/rg";

    #[test]
    fn test_parse_pack_id() {
        let id = PackId::parse(&format!("{SCOPE}/providers/Radius.Core/recipePacks/containers")).unwrap();
        assert_eq!(id.scope, SCOPE);
        assert_eq!(id.name, "containers");
        assert_eq!(id.to_string(), format!("{SCOPE}/providers/Radius.Core/recipePacks/containers"));

        let lower = PackId::parse(&format!("{SCOPE}/providers/radius.core/recipepacks/x")).unwrap();
        assert_eq!(lower.name, "x");
    }

    #[test]
    fn test_parse_rejects_invalid_ids() {
        for id in [
            "not-a-valid-id",
            "/planes/radius/local/resourceGroups/rg/providers/Radius.Core/environments/env",
            "/planes/radius/local/resourceGroups/rg/providers/Radius.Core/recipePacks/",
            "/planes/radius/local/resourceGroups/rg/providers/Radius.Core/recipePacks/a/b",
            "/providers/Radius.Core/recipePacks/a",
            "relative/providers/Radius.Core/recipePacks/a",
        ] {
            assert!(
                matches!(PackId::parse(id), Err(Error::InvalidPackId(_))),
                "expected {id} to be rejected"
            );
        }
    }

    #[test]
    fn test_pack_id_exists() {
        let ids = vec![
            format!("{SCOPE}/providers/Radius.Core/recipePacks/containers"),
            format!("{SCOPE}/providers/Radius.Core/recipePacks/routes"),
        ];
        assert!(pack_id_exists(&ids, &format!("{SCOPE}/providers/Radius.Core/recipePacks/containers")));
        assert!(!pack_id_exists(&ids, &format!("{SCOPE}/providers/Radius.Core/recipePacks/secrets")));
        assert!(!pack_id_exists(&[], "anything"));
    }

    #[test]
    fn test_extract_pack_ids() {
        assert_eq!(extract_pack_ids(None), None);
        assert_eq!(extract_pack_ids(Some(&json!({"other": "value"}))), None);
        assert_eq!(extract_pack_ids(Some(&json!({"recipePacks": "not-an-array"}))), None);
        assert_eq!(extract_pack_ids(Some(&json!({"recipePacks": []}))), None);
        assert_eq!(extract_pack_ids(Some(&json!({"recipePacks": [42, true, null]}))), None);

        let ids = extract_pack_ids(Some(&json!({
            "recipePacks": ["/a/providers/Radius.Core/recipePacks/pack1", 42, "/a/providers/Radius.Core/recipePacks/pack2"]
        })))
        .unwrap();
        assert_eq!(
            ids,
            vec![
                "/a/providers/Radius.Core/recipePacks/pack1",
                "/a/providers/Radius.Core/recipePacks/pack2"
            ]
        );
    }

    #[test]
    fn test_definition_from_recipe() {
        let tf = Recipe::new("redis", SourceKind::LocalScan, "infra/redis.tf");
        assert_eq!(RecipeDefinition::from_recipe(&tf).recipe_kind, RecipeKind::Terraform);

        let oci = Recipe::new("redis", SourceKind::Catalog(Default::default()), "ghcr.io/x/redis:latest");
        let definition = RecipeDefinition::from_recipe(&oci);
        assert_eq!(definition.recipe_kind, RecipeKind::Bicep);
        assert_eq!(definition.recipe_location, "ghcr.io/x/redis:latest");
    }

    #[test]
    fn test_properties_json_shape() {
        let properties = RecipePackProperties::new().with_recipe(
            "Radius.Compute/containers",
            RecipeDefinition::new(RecipeKind::Bicep, "ghcr.io/radius-project/kube-recipes/containers@latest"),
        );
        let json = serde_json::to_value(&properties).unwrap();
        assert_eq!(
            json,
            json!({
                "recipes": {
                    "Radius.Compute/containers": {
                        "recipeKind": "bicep",
                        "recipeLocation": "ghcr.io/radius-project/kube-recipes/containers@latest"
                    }
                }
            })
        );
    }
}
