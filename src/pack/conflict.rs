// src/pack/conflict.rs

//! Detection of resource types claimed by more than one pack

use super::{PackClient, PackId};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

/// A pack reference that was left out of an inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPack {
    pub id: String,
    pub reason: String,
}

/// Ownership of resource types across a set of packs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionReport {
    /// Resource type to the first pack that claims it
    pub covered: BTreeMap<String, String>,
    /// Resource types claimed by more than one pack, owners in inspection order
    pub conflicts: BTreeMap<String, Vec<String>>,
    /// References that could not be resolved
    pub skipped: Vec<SkippedPack>,
}

impl InspectionReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// [`Error::ConflictDetected`] describing every conflict, if any
    pub fn conflict_error(&self) -> Option<Error> {
        self.has_conflicts()
            .then(|| format_conflict_error(&self.conflicts))
    }
}

/// Describe conflicting packs as an error
pub fn format_conflict_error(conflicts: &BTreeMap<String, Vec<String>>) -> Error {
    let mut message = String::from(
        "Recipe pack conflict detected: the following resource types are provided by more than one recipe pack:",
    );
    for (resource_type, packs) in conflicts {
        let _ = write!(message, "\n  - {}: {}", resource_type, packs.join(", "));
    }
    message.push_str("\nRemove the duplicate recipes so each resource type is provided by a single pack.");
    Error::ConflictDetected(message)
}

/// Inspects packs through per-scope storage clients
#[derive(Clone, Default)]
pub struct ConflictDetector {
    clients: HashMap<String, Arc<dyn PackClient>>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve packs in `scope` through `client`
    pub fn with_client(mut self, scope: &str, client: Arc<dyn PackClient>) -> Self {
        self.clients
            .insert(scope.trim_end_matches('/').to_string(), client);
        self
    }

    fn client_for(&self, scope: &str) -> Option<&Arc<dyn PackClient>> {
        self.clients.get(scope).or_else(|| {
            self.clients
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(scope))
                .map(|(_, client)| client)
        })
    }

    /// Report which pack owns each resource type and where owners collide
    ///
    /// Unparseable IDs, IDs in a scope without a client, and packs that do
    /// not exist are skipped. A pack that exists but cannot be read fails the
    /// whole inspection with [`Error::PackFetchFailed`].
    pub async fn inspect(&self, pack_ids: &[String]) -> Result<InspectionReport> {
        let mut report = InspectionReport::default();
        let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen = HashSet::new();

        for raw_id in pack_ids {
            let id = match PackId::parse(raw_id) {
                Ok(id) => id,
                Err(e) => {
                    debug!("Skipping pack reference {}: {}", raw_id, e);
                    report.skipped.push(SkippedPack {
                        id: raw_id.clone(),
                        reason: "unparseable pack ID".to_string(),
                    });
                    continue;
                }
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            let Some(client) = self.client_for(&id.scope) else {
                debug!("Skipping pack {}: no client for scope {}", raw_id, id.scope);
                report.skipped.push(SkippedPack {
                    id: raw_id.clone(),
                    reason: format!("no client for scope {}", id.scope),
                });
                continue;
            };

            let properties = match client.get(&id.name).await {
                Ok(Some(properties)) => properties,
                Ok(None) => {
                    warn!("Recipe pack {} does not exist, skipping", raw_id);
                    report.skipped.push(SkippedPack {
                        id: raw_id.clone(),
                        reason: "pack not found".to_string(),
                    });
                    continue;
                }
                Err(e @ Error::PackFetchFailed { .. }) => return Err(e),
                Err(e) => {
                    return Err(Error::PackFetchFailed {
                        pack: raw_id.clone(),
                        reason: e.to_string(),
                    });
                }
            };

            for resource_type in properties.resource_types() {
                owners
                    .entry(resource_type.to_string())
                    .or_default()
                    .push(id.name.clone());
                report
                    .covered
                    .entry(resource_type.to_string())
                    .or_insert_with(|| id.name.clone());
            }
        }

        report.conflicts = owners
            .into_iter()
            .filter(|(_, packs)| packs.len() > 1)
            .collect();

        if report.has_conflicts() {
            warn!(
                "{} resource type(s) are claimed by more than one recipe pack",
                report.conflicts.len()
            );
        }
        Ok(report)
    }
}
