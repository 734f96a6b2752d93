use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};

use crate::package::{package_key, Package};

/// Read-only view of the packages relevant to one operation.
///
/// `existing` holds host-provided packages this system never touches,
/// `installed` the full managed closure and `root` the ids the user asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlledPackages {
    existing: BTreeMap<String, Package>,
    root: BTreeSet<String>,
    installed: BTreeMap<String, Package>,
}

impl ControlledPackages {
    pub fn new<I, E, R, S>(existing: E, installed: I, root: R) -> Result<Self>
    where
        E: IntoIterator<Item = Package>,
        I: IntoIterator<Item = Package>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let existing = keyed(existing, "existing")?;
        let installed = keyed(installed, "installed")?;

        if let Some(shared) = existing.keys().find(|key| installed.contains_key(*key)) {
            return Err(anyhow!(
                "package '{shared}' is both host-provided and managed"
            ));
        }

        let mut root_keys = BTreeSet::new();
        for id in root {
            let key = package_key(id.as_ref());
            if !installed.contains_key(&key) {
                return Err(anyhow!("root package '{}' is not installed", id.as_ref()));
            }
            root_keys.insert(key);
        }

        Ok(Self {
            existing,
            root: root_keys,
            installed,
        })
    }

    pub fn existing(&self) -> &BTreeMap<String, Package> {
        &self.existing
    }

    pub fn root(&self) -> &BTreeSet<String> {
        &self.root
    }

    pub fn installed(&self) -> &BTreeMap<String, Package> {
        &self.installed
    }

    pub fn installed_package(&self, id: &str) -> Option<&Package> {
        self.installed.get(&package_key(id))
    }

    pub fn existing_package(&self, id: &str) -> Option<&Package> {
        self.existing.get(&package_key(id))
    }

    pub fn is_root(&self, id: &str) -> bool {
        self.root.contains(&package_key(id))
    }

    pub fn root_packages(&self) -> impl Iterator<Item = &Package> + '_ {
        self.root.iter().filter_map(|key| self.installed.get(key))
    }
}

fn keyed<I>(packages: I, label: &str) -> Result<BTreeMap<String, Package>>
where
    I: IntoIterator<Item = Package>,
{
    let mut map = BTreeMap::new();
    for package in packages {
        let key = package.key();
        if let Some(previous) = map.insert(key, package) {
            return Err(anyhow!(
                "duplicate {label} package '{}'",
                previous.id
            ));
        }
    }
    Ok(map)
}
