use anyhow::{Context, Result};
use hostpack_core::Package;
use hostpack_installer::{copy_dir_recursive, FsPackageController, PackageController};
use hostpack_registry::RegistryIndex;
use tracing::{debug, info};

/// Copies a package's published payload from the registry into the project
/// cache, then defers to the filesystem controller.
pub(crate) struct StagingController {
    inner: FsPackageController,
    registry: Option<RegistryIndex>,
}

impl StagingController {
    pub(crate) fn new(inner: FsPackageController, registry: Option<RegistryIndex>) -> Self {
        Self { inner, registry }
    }

    fn stage(&self, package: &Package) -> Result<()> {
        let version = package.version.to_string();
        let cached = self.inner.layout().payload_dir(&package.id, &version);
        if cached.is_dir() {
            debug!(package = %package, "payload already cached");
            return Ok(());
        }
        // without a published payload the controller reports the miss
        let Some(registry) = &self.registry else {
            return Ok(());
        };
        let published = registry.payload_dir(&package.id, &version);
        if !published.is_dir() {
            return Ok(());
        }

        copy_dir_recursive(&published, &cached)
            .with_context(|| format!("failed to stage payload for {package}"))?;
        info!(package = %package, "staged payload from registry");
        Ok(())
    }
}

impl PackageController for StagingController {
    fn install(&self, package: &Package) -> Result<bool> {
        self.stage(package)?;
        self.inner.install(package)
    }

    fn uninstall(&self, package: &Package) -> Result<()> {
        self.inner.uninstall(package)
    }

    fn is_correctly_installed(&self, package: &Package) -> Result<bool> {
        self.inner.is_correctly_installed(package)
    }

    fn has_native(&self, package: &Package) -> Result<bool> {
        self.inner.has_native(package)
    }
}
