use std::collections::BTreeMap;

use hostpack_core::{
    package_key, CatalogClient, ControlledPackages, VersionSelectMethod, VersionSet,
};
use semver::Version;
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::order::install_order;
use crate::removal::removable_packages;
use crate::search::{search, SearchContext, SearchState};
use crate::types::{Constraint, Removal, ResolvedGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    pub only_stable: bool,
    pub method: VersionSelectMethod,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            only_stable: true,
            method: VersionSelectMethod::Suit,
        }
    }
}

pub struct DependencySolver<'a> {
    catalog: &'a dyn CatalogClient,
    options: SolverOptions,
}

impl<'a> DependencySolver<'a> {
    pub fn new(catalog: &'a dyn CatalogClient, options: SolverOptions) -> Self {
        Self { catalog, options }
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    /// Adds or upgrades `id` on top of the installed closure.
    ///
    /// Under `Suit` and `Strict` a version hint pins the package exactly;
    /// `Latest` always takes the newest acceptable version.
    pub fn find_required_packages(
        &self,
        controlled: &ControlledPackages,
        id: &str,
        version_hint: Option<&Version>,
    ) -> Result<ResolvedGraph, ResolveError> {
        let pin = match (self.options.method, version_hint) {
            (VersionSelectMethod::Latest, _) | (_, None) => None,
            (_, Some(version)) => Some(VersionSet::exact(version)),
        };
        self.resolve_over_installed(controlled, id, pin)
    }

    pub fn find_required_packages_when_change_version(
        &self,
        controlled: &ControlledPackages,
        id: &str,
        target_version: &Version,
    ) -> Result<ResolvedGraph, ResolveError> {
        self.resolve_over_installed(controlled, id, Some(VersionSet::exact(target_version)))
    }

    pub fn find_removable_packages(&self, controlled: &ControlledPackages, id: &str) -> Removal {
        removable_packages(controlled, id)
    }

    pub fn check_all_packages(
        &self,
        controlled: &ControlledPackages,
    ) -> Result<ResolvedGraph, ResolveError> {
        let seeds = controlled
            .root_packages()
            .map(|package| Constraint::seed(&package.id, "root"))
            .collect::<Vec<_>>();
        let pins = self.installed_pins(controlled);
        let fallback = seeds
            .first()
            .map(|seed| seed.id.clone())
            .unwrap_or_default();
        self.resolve(controlled, seeds, &pins, &fallback)
    }

    fn resolve_over_installed(
        &self,
        controlled: &ControlledPackages,
        id: &str,
        pin: Option<VersionSet>,
    ) -> Result<ResolvedGraph, ResolveError> {
        let mut seeds = controlled
            .installed()
            .values()
            .map(|package| Constraint::seed(&package.id, "installed"))
            .collect::<Vec<_>>();
        seeds.push(Constraint::seed(id, "request"));

        let mut pins = self.installed_pins(controlled);
        if let Some(pin) = pin {
            pins.insert(package_key(id), pin);
        }

        self.resolve(controlled, seeds, &pins, id)
    }

    fn installed_pins(&self, controlled: &ControlledPackages) -> BTreeMap<String, VersionSet> {
        if self.options.method != VersionSelectMethod::Strict {
            return BTreeMap::new();
        }
        controlled
            .installed()
            .iter()
            .map(|(key, package)| (key.clone(), VersionSet::exact(&package.version)))
            .collect()
    }

    fn resolve(
        &self,
        controlled: &ControlledPackages,
        seeds: Vec<Constraint>,
        pins: &BTreeMap<String, VersionSet>,
        fallback_id: &str,
    ) -> Result<ResolvedGraph, ResolveError> {
        let preferred: BTreeMap<String, Version> = match self.options.method {
            VersionSelectMethod::Latest => BTreeMap::new(),
            VersionSelectMethod::Suit | VersionSelectMethod::Strict => controlled
                .installed()
                .iter()
                .map(|(key, package)| (key.clone(), package.version.clone()))
                .collect(),
        };

        let ctx = SearchContext {
            catalog: self.catalog,
            only_stable: self.options.only_stable,
            method: self.options.method,
            pins,
            preferred: &preferred,
        };
        let mut state = SearchState::new(controlled.existing().clone());
        for seed in seeds {
            state.add_constraint(seed);
        }

        debug!(
            method = %self.options.method,
            only_stable = self.options.only_stable,
            seeds = state.constraints.len(),
            "resolving package graph"
        );
        if !search(&ctx, &mut state)? {
            return Err(state.into_unsatisfiable(fallback_id));
        }

        let order = install_order(&state.selected);
        info!(packages = state.selected.len(), "resolved package graph");
        Ok(ResolvedGraph::new(state.selected, order))
    }
}
