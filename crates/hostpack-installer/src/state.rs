use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result};
use hostpack_core::{package_key, ControlledPackages, Package};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::receipts::{read_install_receipts, write_install_receipt};
use crate::{HostConfig, InstallReason, PrefixLayout, StorageMode};

pub trait PackageStateStore: Send + Sync {
    fn controlled_packages(&self) -> Result<ControlledPackages>;

    fn save_roots(&self, roots: &BTreeSet<String>) -> Result<()>;

    fn storage_mode(&self) -> Result<StorageMode>;

    fn switch_storage_mode(&self, mode: StorageMode) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ExistingPackagesFile {
    #[serde(default)]
    packages: Vec<Package>,
}

#[derive(Debug, Clone)]
pub struct FsStateStore {
    layout: PrefixLayout,
}

impl FsStateStore {
    pub fn new(layout: PrefixLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PrefixLayout {
        &self.layout
    }

    pub fn existing_packages(&self) -> Result<Vec<Package>> {
        let path = self.layout.existing_packages_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading host packages: {}", path.display()))?;
        let file = toml::from_str::<ExistingPackagesFile>(&content)
            .with_context(|| format!("failed parsing host packages: {}", path.display()))?;
        Ok(file.packages)
    }

    pub fn save_existing_packages(&self, packages: &[Package]) -> Result<()> {
        let path = self.layout.existing_packages_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = ExistingPackagesFile {
            packages: packages.to_vec(),
        };
        let content = toml::to_string(&file)
            .with_context(|| format!("failed serializing host packages: {}", path.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed writing host packages: {}", path.display()))
    }

    pub fn config(&self) -> Result<HostConfig> {
        HostConfig::load(&self.layout.config_path())
    }
}

impl PackageStateStore for FsStateStore {
    fn controlled_packages(&self) -> Result<ControlledPackages> {
        let receipts = read_install_receipts(&self.layout)?;
        let roots = receipts
            .iter()
            .filter(|receipt| receipt.install_reason == InstallReason::Root)
            .map(|receipt| receipt.id.clone())
            .collect::<Vec<_>>();
        let installed = receipts.iter().map(|receipt| receipt.to_package());
        ControlledPackages::new(self.existing_packages()?, installed, roots)
            .context("installed package state is inconsistent")
    }

    fn save_roots(&self, roots: &BTreeSet<String>) -> Result<()> {
        for mut receipt in read_install_receipts(&self.layout)? {
            let reason = if roots.contains(&package_key(&receipt.id)) {
                InstallReason::Root
            } else {
                InstallReason::Dependency
            };
            if receipt.install_reason != reason {
                debug!(package = %receipt.id, reason = reason.as_str(), "updating install reason");
                receipt.install_reason = reason;
                write_install_receipt(&self.layout, &receipt)?;
            }
        }
        Ok(())
    }

    fn storage_mode(&self) -> Result<StorageMode> {
        Ok(self.config()?.storage_mode)
    }

    fn switch_storage_mode(&self, mode: StorageMode) -> Result<()> {
        let path = self.layout.config_path();
        let mut config = HostConfig::load(&path)?;
        config.storage_mode = mode;
        config.save(&path)?;
        info!(%mode, "switched storage mode");
        Ok(())
    }
}
