use std::collections::HashSet;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::package::{package_key, Package, PackageDependency};
use crate::version_set::serde_version;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(with = "serde_version")]
    pub version: Version,
    #[serde(default)]
    pub target_framework: String,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
    #[serde(default)]
    pub require_license_acceptance: bool,
    pub license_url: Option<String>,
}

impl CatalogEntry {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let entry: Self = toml::from_str(input).context("failed to parse catalog entry")?;
        if entry.id.trim().is_empty() {
            return Err(anyhow!("catalog entry id must not be empty"));
        }

        let own_key = package_key(&entry.id);
        let mut seen = HashSet::new();
        for dependency in &entry.dependencies {
            let key = dependency.key();
            if key == own_key {
                return Err(anyhow!("catalog entry '{}' depends on itself", entry.id));
            }
            if !seen.insert(key) {
                return Err(anyhow!(
                    "catalog entry '{}@{}' declares dependency '{}' more than once",
                    entry.id,
                    entry.version,
                    dependency.id
                ));
            }
        }
        Ok(entry)
    }

    pub fn is_stable(&self) -> bool {
        self.version.pre.is_empty()
    }

    pub fn to_package(&self) -> Package {
        Package {
            id: self.id.clone(),
            version: self.version.clone(),
            target_framework: self.target_framework.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    id: String,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        entries.dedup_by(|a, b| a.version == b.version);
        Self {
            id: id.into(),
            entries,
        }
    }

    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, version: &Version) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.version == version)
    }

    pub fn latest(&self, only_stable: bool) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| !only_stable || entry.is_stable())
    }
}

pub trait CatalogClient: Send + Sync {
    fn get_catalog(&self, id: &str) -> anyhow::Result<Catalog>;
}
