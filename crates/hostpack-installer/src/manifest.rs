use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::PrefixLayout;

/// The host package manager's `Packages/manifest.json`. Keys this crate does
/// not own are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl HostManifest {
    pub fn load(layout: &PrefixLayout) -> Result<Self> {
        let path = layout.manifest_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading host manifest: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing host manifest: {}", path.display()))
    }

    pub fn save(&self, layout: &PrefixLayout) -> Result<()> {
        let path = layout.manifest_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .with_context(|| format!("failed serializing host manifest: {}", path.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed writing host manifest: {}", path.display()))
    }

    pub fn register(&mut self, id: &str, location: String) {
        self.unregister(id);
        self.dependencies.insert(id.to_string(), location);
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.dependencies.len();
        self.dependencies
            .retain(|name, _| !name.eq_ignore_ascii_case(id));
        before != self.dependencies.len()
    }

    pub fn registration(&self, id: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(id))
            .map(|(_, location)| location.as_str())
    }
}
