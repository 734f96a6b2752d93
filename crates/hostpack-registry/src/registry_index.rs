use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hostpack_core::{package_key, Catalog, CatalogClient, CatalogEntry};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RegistryIndex {
    root: PathBuf,
}

impl RegistryIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_root(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn payload_dir(&self, id: &str, version: &str) -> PathBuf {
        self.root
            .join("payloads")
            .join(package_key(id))
            .join(version)
    }

    pub fn search_names(&self, needle: &str) -> Result<Vec<String>> {
        let index_root = self.index_root();
        if !index_root.exists() {
            return Ok(Vec::new());
        }

        let needle = needle.trim().to_ascii_lowercase();
        let mut names = Vec::new();
        for entry in fs::read_dir(&index_root).context("failed to read registry index")? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().to_string();
            if !dir_name.to_ascii_lowercase().contains(&needle) {
                continue;
            }
            if let Some(latest) = self.package_versions(&dir_name)?.into_iter().next() {
                names.push(latest.id);
            }
        }

        names.sort_by_key(|name| package_key(name));
        Ok(names)
    }

    pub fn package_versions(&self, id: &str) -> Result<Vec<CatalogEntry>> {
        let Some(package_dir) = self.package_dir(id)? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&package_dir)
            .with_context(|| format!("failed to read package directory: {id}"))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("toml") {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed reading catalog entry: {}", path.display()))?;
            let catalog_entry = CatalogEntry::from_toml_str(&content)
                .with_context(|| format!("failed parsing catalog entry: {}", path.display()))?;
            if !catalog_entry.id.eq_ignore_ascii_case(id.trim()) {
                anyhow::bail!(
                    "catalog entry {} declares id '{}' but is filed under '{}'",
                    path.display(),
                    catalog_entry.id,
                    id
                );
            }
            entries.push(catalog_entry);
        }

        entries.sort_by(|a, b| b.version.cmp(&a.version));
        debug!(package = id, versions = entries.len(), "loaded catalog entries");
        Ok(entries)
    }

    fn package_dir(&self, id: &str) -> Result<Option<PathBuf>> {
        let index_root = self.index_root();
        let direct = index_root.join(id.trim());
        if direct.is_dir() {
            return Ok(Some(direct));
        }
        if !index_root.exists() {
            return Ok(None);
        }

        let key = package_key(id);
        for entry in fs::read_dir(&index_root).context("failed to read registry index")? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && entry.file_name().to_string_lossy().to_ascii_lowercase() == key
            {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

impl CatalogClient for RegistryIndex {
    fn get_catalog(&self, id: &str) -> Result<Catalog> {
        Ok(Catalog::new(id.trim(), self.package_versions(id)?))
    }
}
