use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hostpack_core::VersionSelectMethod;
use serde::{Deserialize, Serialize};

use crate::StorageMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub storage_mode: StorageMode,
    pub only_stable: bool,
    pub method: VersionSelectMethod,
    pub host_frameworks: Vec<String>,
    pub registry_root: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            only_stable: true,
            method: VersionSelectMethod::default(),
            host_frameworks: Vec::new(),
            registry_root: None,
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse host config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading host config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed parsing host config: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string(self)
            .with_context(|| format!("failed serializing host config: {}", path.display()))?;
        fs::write(path, content)
            .with_context(|| format!("failed writing host config: {}", path.display()))
    }
}
