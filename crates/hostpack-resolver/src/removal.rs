use std::collections::{BTreeMap, BTreeSet, HashSet};

use hostpack_core::{package_key, ControlledPackages, Package};

use crate::types::Removal;

/// Computes what disappears when `id` is dropped from the root set: every
/// installed package no longer reachable from the remaining roots.
pub fn removable_packages(controlled: &ControlledPackages, id: &str) -> Removal {
    let key = package_key(id);
    let installed = controlled.installed();
    if !installed.contains_key(&key) {
        return Removal::NotInstalled;
    }

    let edges = dependency_edges(installed);
    let remaining_roots = controlled
        .root()
        .iter()
        .filter(|root| **root != key)
        .cloned()
        .collect::<Vec<_>>();
    let reachable = reachable_packages(&remaining_roots, &edges);

    if reachable.contains(&key) {
        let by = remaining_roots
            .iter()
            .filter(|root| reachable_packages(std::slice::from_ref(*root), &edges).contains(&key))
            .filter_map(|root| installed.get(root).map(|package| package.id.clone()))
            .collect::<Vec<_>>();
        return Removal::DependedUpon { by };
    }

    Removal::Removable(
        installed
            .iter()
            .filter(|(installed_key, _)| !reachable.contains(*installed_key))
            .map(|(_, package)| package.clone())
            .collect::<BTreeSet<_>>(),
    )
}

fn dependency_edges(installed: &BTreeMap<String, Package>) -> BTreeMap<String, BTreeSet<String>> {
    installed
        .iter()
        .map(|(key, package)| {
            let deps = package
                .dependencies
                .iter()
                .map(|dependency| dependency.key())
                .filter(|dep_key| installed.contains_key(dep_key))
                .collect::<BTreeSet<_>>();
            (key.clone(), deps)
        })
        .collect()
}

fn reachable_packages(
    roots: &[String],
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> HashSet<String> {
    let mut visited = HashSet::new();
    let mut stack = roots.to_vec();
    while let Some(next) = stack.pop() {
        if !visited.insert(next.clone()) {
            continue;
        }
        if let Some(children) = edges.get(&next) {
            stack.extend(
                children
                    .iter()
                    .filter(|child| !visited.contains(*child))
                    .cloned(),
            );
        }
    }
    visited
}
