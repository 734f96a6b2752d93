use std::path::Path;

use anyhow::{Context, Result};
use hostpack_core::Package;
use tracing::{debug, info, warn};

use crate::fs_utils::{copy_dir_recursive, remove_dir_if_exists};
use crate::manifest::HostManifest;
use crate::marker::current_unix_timestamp;
use crate::receipts::{read_install_receipt, remove_install_receipt, write_install_receipt};
use crate::{InstallReason, InstallReceipt, PrefixLayout, StorageMode};

pub trait PackageController: Send + Sync {
    fn install(&self, package: &Package) -> Result<bool>;

    fn uninstall(&self, package: &Package) -> Result<()>;

    fn is_correctly_installed(&self, package: &Package) -> Result<bool>;

    fn has_native(&self, package: &Package) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct FsPackageController {
    layout: PrefixLayout,
    mode: StorageMode,
}

impl FsPackageController {
    pub fn new(layout: PrefixLayout, mode: StorageMode) -> Self {
        Self { layout, mode }
    }

    pub fn layout(&self) -> &PrefixLayout {
        &self.layout
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    fn place(
        &self,
        package: &Package,
        payload: &Path,
        destination: &Path,
        reason: InstallReason,
    ) -> Result<bool> {
        remove_dir_if_exists(destination)
            .with_context(|| format!("failed to clear {}", destination.display()))?;
        let files = copy_dir_recursive(payload, destination)?;
        let native = files.iter().any(|file| is_native_path(file));

        if self.mode == StorageMode::HostManaged {
            let mut manifest = HostManifest::load(&self.layout)?;
            manifest.register(
                &package.id,
                format!("file:{}", PrefixLayout::manifest_entry_name(package)),
            );
            manifest.save(&self.layout)?;
        }

        let receipt = InstallReceipt {
            id: package.id.clone(),
            version: package.version.clone(),
            dependencies: package.dependencies.clone(),
            target_framework: package.target_framework.clone(),
            storage_mode: self.mode,
            install_reason: reason,
            files,
            native,
            installed_at_unix: current_unix_timestamp()?,
        };
        write_install_receipt(&self.layout, &receipt)?;
        Ok(native)
    }

    /// Best effort: a failed install leaves no files, registration or receipt.
    fn discard_partial(&self, package: &Package, destination: &Path) {
        if let Err(err) = remove_dir_if_exists(destination) {
            warn!(package = %package, error = %format!("{err:#}"), "failed to remove partial install");
        }
        if self.mode == StorageMode::HostManaged {
            let unregistered = HostManifest::load(&self.layout).and_then(|mut manifest| {
                if manifest.unregister(&package.id) {
                    manifest.save(&self.layout)?;
                }
                Ok(())
            });
            if let Err(err) = unregistered {
                warn!(package = %package, error = %format!("{err:#}"), "failed to drop manifest registration");
            }
        }
        if let Err(err) = remove_install_receipt(&self.layout, &package.id) {
            warn!(package = %package, error = %format!("{err:#}"), "failed to remove partial receipt");
        }
    }
}

impl PackageController for FsPackageController {
    fn install(&self, package: &Package) -> Result<bool> {
        let payload = self
            .layout
            .payload_dir(&package.id, &package.version.to_string());
        if !payload.is_dir() {
            anyhow::bail!(
                "payload for {package} is not in the cache: {}",
                payload.display()
            );
        }

        let previous = read_install_receipt(&self.layout, &package.id)?;
        if let Some(previous) = &previous {
            if previous.version != package.version || previous.storage_mode != self.mode {
                debug!(package = %package, previous = %previous.version, "replacing installed version");
                self.uninstall(&previous.to_package())?;
            }
        }

        let reason = previous
            .map(|previous| previous.install_reason)
            .unwrap_or(InstallReason::Dependency);
        let destination = self.layout.storage_dir(self.mode, package);
        match self.place(package, &payload, &destination, reason) {
            Ok(native) => {
                info!(package = %package, mode = %self.mode, native, "installed package");
                Ok(native)
            }
            Err(err) => {
                self.discard_partial(package, &destination);
                Err(err)
            }
        }
    }

    fn uninstall(&self, package: &Package) -> Result<()> {
        let Some(receipt) = read_install_receipt(&self.layout, &package.id)? else {
            // no receipt: only a stray copy from an interrupted install can remain
            let stray = self.layout.storage_dir(self.mode, package);
            remove_dir_if_exists(&stray)
                .with_context(|| format!("failed to remove {}", stray.display()))?;
            debug!(package = %package, "uninstall found no receipt");
            return Ok(());
        };
        if receipt.version != package.version {
            warn!(
                package = %package,
                installed = %receipt.version,
                "uninstalling a different installed version"
            );
        }

        let installed = receipt.to_package();
        let storage = self.layout.storage_dir(receipt.storage_mode, &installed);
        remove_dir_if_exists(&storage)
            .with_context(|| format!("failed to remove {}", storage.display()))?;

        if receipt.storage_mode == StorageMode::HostManaged {
            let mut manifest = HostManifest::load(&self.layout)?;
            if manifest.unregister(&receipt.id) {
                manifest.save(&self.layout)?;
            }
        }

        remove_install_receipt(&self.layout, &receipt.id)?;
        info!(package = %installed, mode = %receipt.storage_mode, "uninstalled package");
        Ok(())
    }

    fn is_correctly_installed(&self, package: &Package) -> Result<bool> {
        let Some(receipt) = read_install_receipt(&self.layout, &package.id)? else {
            return Ok(false);
        };
        if receipt.version != package.version {
            return Ok(false);
        }

        let storage = self.layout.storage_dir(receipt.storage_mode, package);
        if !receipt
            .files
            .iter()
            .all(|file| storage.join(Path::new(file)).is_file())
        {
            debug!(package = %package, "installed files are missing");
            return Ok(false);
        }

        if receipt.storage_mode == StorageMode::HostManaged {
            let manifest = HostManifest::load(&self.layout)?;
            if manifest.registration(&receipt.id).is_none() {
                debug!(package = %package, "host manifest registration is missing");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn has_native(&self, package: &Package) -> Result<bool> {
        Ok(read_install_receipt(&self.layout, &package.id)?
            .map(|receipt| receipt.native)
            .unwrap_or(false))
    }
}

pub(crate) fn is_native_path(rel_path: &str) -> bool {
    let lower = rel_path.to_ascii_lowercase();
    if lower.starts_with("runtimes/") || lower.contains("/runtimes/") {
        return true;
    }
    [".so", ".dylib", ".bundle"]
        .iter()
        .any(|extension| lower.ends_with(extension))
}
