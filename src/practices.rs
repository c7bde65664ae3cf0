// src/practices.rs

//! Detection of the infrastructure-as-code dialect a project already uses
//!
//! The preference-aware ranking policy biases towards recipes written in the
//! dominant dialect of the surrounding project.

use crate::types::IacLanguage;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Directories never worth descending into when scanning a project
pub(crate) const SKIPPED_DIRS: &[&str] = &[".git", ".terraform", "node_modules", "target", ".venv"];

/// Count of IaC files found in a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IacUsage {
    pub terraform_files: usize,
    pub bicep_files: usize,
}

impl IacUsage {
    /// Dominant dialect; ties and empty projects fall back to Bicep
    pub fn dominant(&self) -> IacLanguage {
        if self.terraform_files > self.bicep_files {
            IacLanguage::Terraform
        } else {
            IacLanguage::Bicep
        }
    }

    /// Whether any IaC file was seen at all
    pub fn is_empty(&self) -> bool {
        self.terraform_files == 0 && self.bicep_files == 0
    }
}

pub(crate) fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Count Terraform and Bicep files below `root`
pub fn scan_iac_usage(root: &Path) -> IacUsage {
    let mut usage = IacUsage::default();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        match entry.path().extension().and_then(|ext| ext.to_str()) {
            Some("tf") => usage.terraform_files += 1,
            Some("bicep") => usage.bicep_files += 1,
            _ => {}
        }
    }

    debug!(
        "IaC usage in {}: {} terraform, {} bicep",
        root.display(),
        usage.terraform_files,
        usage.bicep_files
    );
    usage
}

/// Detect the preferred IaC dialect of the project at `root`
pub fn detect_iac_language(root: &Path) -> IacLanguage {
    scan_iac_usage(root).dominant()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_project_prefers_bicep() {
        let dir = tempfile::tempdir().unwrap();
        let usage = scan_iac_usage(dir.path());
        assert!(usage.is_empty());
        assert_eq!(usage.dominant(), IacLanguage::Bicep);
    }

    #[test]
    fn test_terraform_majority() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("infra")).unwrap();
        fs::write(dir.path().join("infra/main.tf"), "").unwrap();
        fs::write(dir.path().join("infra/redis.tf"), "").unwrap();
        fs::write(dir.path().join("app.bicep"), "").unwrap();

        let usage = scan_iac_usage(dir.path());
        assert_eq!(usage.terraform_files, 2);
        assert_eq!(usage.bicep_files, 1);
        assert_eq!(detect_iac_language(dir.path()), IacLanguage::Terraform);
    }

    #[test]
    fn test_skips_vendored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".terraform/modules")).unwrap();
        fs::write(dir.path().join(".terraform/modules/a.tf"), "").unwrap();
        fs::write(dir.path().join(".terraform/modules/b.tf"), "").unwrap();
        fs::write(dir.path().join("main.bicep"), "").unwrap();

        assert_eq!(detect_iac_language(dir.path()), IacLanguage::Bicep);
    }
}
