use anyhow::{Context, Result};
use hostpack_core::{package_key, Package};
use std::fs;
use std::path::{Path, PathBuf};

use crate::StorageMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLayout {
    project: PathBuf,
}

impl PrefixLayout {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.project.join("Packages")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.packages_dir().join("manifest.json")
    }

    pub fn vendored_dir(&self) -> PathBuf {
        self.project.join("Assets").join("Packages")
    }

    pub fn library_dir(&self) -> PathBuf {
        self.project.join("Library").join("hostpack")
    }

    pub fn config_path(&self) -> PathBuf {
        self.library_dir().join("config.toml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.library_dir().join("cache")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.library_dir().join("state")
    }

    pub fn installed_state_dir(&self) -> PathBuf {
        self.state_dir().join("installed")
    }

    pub fn existing_packages_path(&self) -> PathBuf {
        self.state_dir().join("existing.toml")
    }

    pub fn resume_path(&self) -> PathBuf {
        self.state_dir().join("resume.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("operation.lock")
    }

    pub fn payload_dir(&self, id: &str, version: &str) -> PathBuf {
        self.cache_dir().join(package_key(id)).join(version)
    }

    pub fn receipt_path(&self, id: &str) -> PathBuf {
        self.installed_state_dir()
            .join(format!("{}.receipt", package_key(id)))
    }

    pub fn manifest_entry_name(package: &Package) -> String {
        format!("{}@{}", package.id, package.version)
    }

    pub fn storage_dir(&self, mode: StorageMode, package: &Package) -> PathBuf {
        match mode {
            StorageMode::HostManaged => self
                .packages_dir()
                .join(Self::manifest_entry_name(package)),
            StorageMode::Vendored => self
                .vendored_dir()
                .join(format!("{}.{}", package.id, package.version)),
        }
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.packages_dir(),
            self.vendored_dir(),
            self.cache_dir(),
            self.state_dir(),
            self.installed_state_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
