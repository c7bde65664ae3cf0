// src/pack/client.rs

//! Pack storage clients
//!
//! One client serves one administrative scope. Writes replace the whole pack
//! and are idempotent, so a retried run converges on the same state.

use super::RecipePackProperties;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Storage of recipe packs within one scope
#[async_trait]
pub trait PackClient: Send + Sync {
    /// Read a pack; `None` if no pack has this name
    async fn get(&self, name: &str) -> Result<Option<RecipePackProperties>>;

    /// Create or replace a pack
    async fn create_or_update(&self, name: &str, properties: &RecipePackProperties) -> Result<()>;

    /// Names of all packs in the scope, sorted
    async fn list(&self) -> Result<Vec<String>>;
}

/// Pack store held in memory
#[derive(Debug, Default)]
pub struct InMemoryPackClient {
    packs: RwLock<BTreeMap<String, RecipePackProperties>>,
    writes: AtomicUsize,
}

impl InMemoryPackClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pack without counting it as a write
    pub fn with_pack(mut self, name: &str, properties: RecipePackProperties) -> Self {
        self.packs.get_mut().insert(name.to_string(), properties);
        self
    }

    /// Number of create-or-update calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackClient for InMemoryPackClient {
    async fn get(&self, name: &str) -> Result<Option<RecipePackProperties>> {
        Ok(self.packs.read().await.get(name).cloned())
    }

    async fn create_or_update(&self, name: &str, properties: &RecipePackProperties) -> Result<()> {
        self.packs
            .write()
            .await
            .insert(name.to_string(), properties.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.packs.read().await.keys().cloned().collect())
    }
}

/// Pack store with one `<name>.json` document per pack in a directory
#[derive(Debug, Clone)]
pub struct FilePackClient {
    dir: PathBuf,
}

impl FilePackClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pack_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(Error::InvalidPackId(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl PackClient for FilePackClient {
    async fn get(&self, name: &str) -> Result<Option<RecipePackProperties>> {
        let path = self.pack_path(name)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::PackFetchFailed {
                    pack: name.to_string(),
                    reason: format!("{}: {e}", path.display()),
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::PackFetchFailed {
                pack: name.to_string(),
                reason: format!("invalid pack document {}: {e}", path.display()),
            })
    }

    async fn create_or_update(&self, name: &str, properties: &RecipePackProperties) -> Result<()> {
        let path = self.pack_path(name)?;
        let write_failed = |reason: String| Error::PackWriteFailed {
            pack: name.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_failed(format!("{}: {e}", self.dir.display())))?;

        let json = serde_json::to_string_pretty(properties)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| write_failed(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| write_failed(format!("{}: {e}", path.display())))?;

        debug!("Wrote recipe pack {} to {}", name, path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to list packs in {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
