use std::collections::{BTreeMap, BTreeSet};

use hostpack_core::{package_key, Package, VersionSet};

#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub id: String,
    pub range: VersionSet,
    pub required_by: String,
}

impl Constraint {
    pub(crate) fn seed(id: &str, required_by: &str) -> Self {
        Self {
            id: id.trim().to_string(),
            range: VersionSet::any(),
            required_by: required_by.to_string(),
        }
    }

    pub(crate) fn key(&self) -> String {
        package_key(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGraph {
    packages: BTreeMap<String, Package>,
    install_order: Vec<String>,
}

impl ResolvedGraph {
    pub(crate) fn new(packages: BTreeMap<String, Package>, install_order: Vec<String>) -> Self {
        Self {
            packages,
            install_order,
        }
    }

    pub fn packages(&self) -> &BTreeMap<String, Package> {
        &self.packages
    }

    pub fn get(&self, id: &str) -> Option<&Package> {
        self.packages.get(&package_key(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(&package_key(id))
    }

    pub fn install_order(&self) -> &[String] {
        &self.install_order
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Package> + '_ {
        self.install_order
            .iter()
            .filter_map(|key| self.packages.get(key))
    }

    pub fn to_set(&self) -> BTreeSet<Package> {
        self.packages.values().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removable(BTreeSet<Package>),
    DependedUpon { by: Vec<String> },
    NotInstalled,
}
