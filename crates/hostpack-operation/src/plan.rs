use std::collections::{BTreeMap, BTreeSet};

use hostpack_core::{package_key, ControlledPackages, Package};
use hostpack_installer::{PackageController, ResumeRecord};
use hostpack_resolver::{install_order, DependencySolver, Removal, ResolvedGraph};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{Intent, OperationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPlan {
    pub root: BTreeSet<String>,
    pub install: Vec<Package>,
    /// Packages to remove, dependents first. Includes the old side of every
    /// version swap.
    pub delete: Vec<Package>,
    pub skipped: Vec<Package>,
    pub baseline: Vec<Package>,
    pub requested: Option<Package>,
}

impl OperationPlan {
    pub fn is_noop(&self) -> bool {
        self.install.is_empty() && self.delete.is_empty()
    }

    pub fn uninstall_only(&self) -> Vec<&Package> {
        self.delete
            .iter()
            .filter(|deleted| !self.install.iter().any(|added| added.is_same_id(&deleted.id)))
            .collect()
    }

    pub fn changes(&self) -> Vec<(&Package, &Package)> {
        self.install
            .iter()
            .filter_map(|added| {
                self.delete
                    .iter()
                    .find(|deleted| deleted.is_same_id(&added.id))
                    .map(|deleted| (deleted, added))
            })
            .collect()
    }

    pub fn fresh_installs(&self) -> Vec<&Package> {
        self.install
            .iter()
            .filter(|added| !self.delete.iter().any(|deleted| deleted.is_same_id(&added.id)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Ready(OperationPlan),
    DependedUpon { id: String, by: Vec<String> },
    NotInstalled { id: String },
}

/// Derives the diff for `intent` against `snapshot`. Nothing is mutated;
/// `controller` is only probed.
pub fn plan_operation(
    intent: &Intent,
    snapshot: &ControlledPackages,
    solver: &DependencySolver<'_>,
    controller: &dyn PackageController,
    pending: Option<&ResumeRecord>,
) -> Result<PlanOutcome, OperationError> {
    let baseline = dependency_order(snapshot.installed().values().cloned());
    let mut plan = OperationPlan {
        root: snapshot.root().clone(),
        baseline,
        ..OperationPlan::default()
    };

    match intent {
        Intent::Install { id, version } => {
            if let Some(existing) = snapshot.existing_package(id) {
                plan.skipped.push(existing.clone());
                return Ok(PlanOutcome::Ready(plan));
            }
            let graph = solver.find_required_packages(snapshot, id, version.as_ref())?;
            apply_graph(&mut plan, snapshot, &graph, id);
        }
        Intent::ChangeVersion { id, version } => {
            if let Some(existing) = snapshot.existing_package(id) {
                plan.skipped.push(existing.clone());
                return Ok(PlanOutcome::Ready(plan));
            }
            let graph = solver.find_required_packages_when_change_version(snapshot, id, version)?;
            apply_graph(&mut plan, snapshot, &graph, id);
        }
        Intent::Uninstall { id } => match solver.find_removable_packages(snapshot, id) {
            Removal::Removable(removable) => {
                let key = package_key(id);
                plan.requested = snapshot.installed_package(id).cloned();
                plan.root.remove(&key);
                plan.delete = dependents_first(removable);
            }
            Removal::DependedUpon { by } => {
                return Ok(PlanOutcome::DependedUpon {
                    id: id.clone(),
                    by,
                })
            }
            Removal::NotInstalled => return Ok(PlanOutcome::NotInstalled { id: id.clone() }),
        },
        Intent::Repair { id } => {
            let targets = match id {
                Some(id) => match snapshot.installed_package(id) {
                    Some(package) => vec![package.clone()],
                    None => return Ok(PlanOutcome::NotInstalled { id: id.clone() }),
                },
                None => plan.baseline.clone(),
            };
            let broken = incorrectly_installed(controller, &targets);
            debug!(checked = targets.len(), broken = broken.len(), "probed installed packages");
            plan.install = dependency_order(broken.iter().cloned());
            plan.delete = dependents_first(broken);
        }
        Intent::ReinstallAll => {
            let graph = solver.check_all_packages(snapshot)?;
            plan.install = graph
                .ordered()
                .filter(|package| snapshot.existing_package(&package.id).is_none())
                .cloned()
                .collect();
            plan.delete = dependents_first(snapshot.installed().values().cloned());
            plan.root.retain(|key| graph.contains(key));
        }
        Intent::Cleanup => {
            plan.root.clear();
            plan.delete = dependents_first(snapshot.installed().values().cloned());
        }
        Intent::ConvertStorageMode { .. } => {
            plan.install = plan.baseline.clone();
            plan.delete = dependents_first(snapshot.installed().values().cloned());
        }
        Intent::Resume => {
            let record = pending.ok_or(OperationError::NothingToResume)?;
            plan.install = record.install.clone();
            plan.root = record.root.iter().map(|id| package_key(id)).collect();
            plan.baseline = record.rollback.clone();
        }
    }

    debug!(
        intent = %intent,
        install = plan.install.len(),
        delete = plan.delete.len(),
        roots = plan.root.len(),
        "planned operation"
    );
    Ok(PlanOutcome::Ready(plan))
}

fn apply_graph(
    plan: &mut OperationPlan,
    snapshot: &ControlledPackages,
    graph: &ResolvedGraph,
    id: &str,
) {
    plan.install = graph
        .ordered()
        .filter(|package| snapshot.existing_package(&package.id).is_none())
        .filter(|package| {
            snapshot
                .installed_package(&package.id)
                .map(|installed| installed.version != package.version)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    plan.delete = dependents_first(
        snapshot
            .installed()
            .values()
            .filter(|installed| {
                graph
                    .get(&installed.id)
                    .map(|package| package.version != installed.version)
                    .unwrap_or(false)
            })
            .cloned(),
    );
    plan.root.insert(package_key(id));
    plan.requested = graph.get(id).cloned();
}

fn incorrectly_installed(controller: &dyn PackageController, packages: &[Package]) -> Vec<Package> {
    packages
        .par_iter()
        .filter(|package| match controller.is_correctly_installed(package) {
            Ok(correct) => !correct,
            Err(err) => {
                warn!(package = %package, error = %format!("{err:#}"), "integrity probe failed");
                true
            }
        })
        .cloned()
        .collect()
}

pub(crate) fn dependency_order(packages: impl IntoIterator<Item = Package>) -> Vec<Package> {
    let mut keyed = packages
        .into_iter()
        .map(|package| (package.key(), package))
        .collect::<BTreeMap<_, _>>();
    install_order(&keyed)
        .into_iter()
        .filter_map(|key| keyed.remove(&key))
        .collect()
}

fn dependents_first(packages: impl IntoIterator<Item = Package>) -> Vec<Package> {
    let mut ordered = dependency_order(packages);
    ordered.reverse();
    ordered
}
