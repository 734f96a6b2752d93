use std::collections::{BTreeMap, HashMap};

use hostpack_core::{
    preference_order, Catalog, CatalogClient, CatalogEntry, Package, VersionSelectMethod,
    VersionSet,
};
use semver::Version;
use tracing::{debug, trace};

use crate::constraints::{describe_constraints, first_unsatisfied};
use crate::error::ResolveError;
use crate::types::Constraint;

pub(crate) struct SearchContext<'a> {
    pub catalog: &'a dyn CatalogClient,
    pub only_stable: bool,
    pub method: VersionSelectMethod,
    pub pins: &'a BTreeMap<String, VersionSet>,
    pub preferred: &'a BTreeMap<String, Version>,
}

#[derive(Debug, Clone)]
pub(crate) struct Conflict {
    pub id: String,
    pub detail: String,
}

pub(crate) struct SearchState {
    pub constraints: BTreeMap<String, Vec<Constraint>>,
    pub selected: BTreeMap<String, Package>,
    versions_cache: HashMap<String, Catalog>,
    conflict: Option<Conflict>,
}

impl SearchState {
    pub(crate) fn new(fixed: BTreeMap<String, Package>) -> Self {
        Self {
            constraints: BTreeMap::new(),
            selected: fixed,
            versions_cache: HashMap::new(),
            conflict: None,
        }
    }

    pub(crate) fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints
            .entry(constraint.key())
            .or_default()
            .push(constraint);
    }

    pub(crate) fn into_unsatisfiable(self, fallback_id: &str) -> ResolveError {
        match self.conflict {
            Some(conflict) => ResolveError::Unsatisfiable {
                id: conflict.id,
                detail: conflict.detail,
            },
            None => ResolveError::Unsatisfiable {
                id: fallback_id.to_string(),
                detail: "[*]".to_string(),
            },
        }
    }

    fn record_conflict(&mut self, key: &str, pins: &BTreeMap<String, VersionSet>) {
        let reqs = self.constraints.get(key).cloned().unwrap_or_default();
        let id = reqs
            .first()
            .map(|req| req.id.clone())
            .or_else(|| self.selected.get(key).map(|package| package.id.clone()))
            .unwrap_or_else(|| key.to_string());
        let detail = describe_constraints(&reqs, pins.get(key));
        trace!(package = %id, %detail, "recorded resolution conflict");
        self.conflict = Some(Conflict { id, detail });
    }
}

pub(crate) fn search(ctx: &SearchContext<'_>, state: &mut SearchState) -> Result<bool, ResolveError> {
    let Some(next) = state
        .constraints
        .keys()
        .find(|key| !state.selected.contains_key(*key))
        .cloned()
    else {
        return match first_unsatisfied(&state.selected, &state.constraints, ctx.pins) {
            Some(violated) => {
                state.record_conflict(&violated, ctx.pins);
                Ok(false)
            }
            None => Ok(true),
        };
    };

    let candidates = matching_candidates(ctx, state, &next)?;
    if candidates.is_empty() {
        state.record_conflict(&next, ctx.pins);
        return Ok(false);
    }

    for candidate in candidates {
        let package = candidate.to_package();
        debug!(package = %package, "trying candidate");

        let mut added_constraints: Vec<(String, usize)> = Vec::new();
        for dependency in &package.dependencies {
            let key = dependency.key();
            let list = state.constraints.entry(key.clone()).or_default();
            list.push(Constraint {
                id: dependency.id.clone(),
                range: dependency.range.clone(),
                required_by: package.to_string(),
            });
            added_constraints.push((key, list.len()));
        }
        state.selected.insert(next.clone(), package);

        match first_unsatisfied(&state.selected, &state.constraints, ctx.pins) {
            None => {
                if search(ctx, state)? {
                    return Ok(true);
                }
            }
            Some(violated) => state.record_conflict(&violated, ctx.pins),
        }

        for (key, len) in added_constraints.into_iter().rev() {
            if let Some(list) = state.constraints.get_mut(&key) {
                list.truncate(len.saturating_sub(1));
            }
        }
        state.constraints.retain(|_, reqs| !reqs.is_empty());
        state.selected.remove(&next);
    }

    Ok(false)
}

fn matching_candidates(
    ctx: &SearchContext<'_>,
    state: &mut SearchState,
    key: &str,
) -> Result<Vec<CatalogEntry>, ResolveError> {
    let reqs = state.constraints.get(key).cloned().unwrap_or_default();
    let display_id = reqs
        .first()
        .map(|req| req.id.clone())
        .unwrap_or_else(|| key.to_string());

    if !state.versions_cache.contains_key(key) {
        let catalog = ctx
            .catalog
            .get_catalog(&display_id)
            .map_err(|err| ResolveError::Catalog {
                id: display_id.clone(),
                message: format!("{err:#}"),
            })?;
        if catalog.is_empty() {
            return Err(ResolveError::NotFound { id: display_id });
        }
        state.versions_cache.insert(key.to_string(), catalog);
    }

    let Some(catalog) = state.versions_cache.get(key) else {
        return Err(ResolveError::NotFound { id: display_id });
    };

    let pin = ctx.pins.get(key);
    let pinned_exact = pin.and_then(VersionSet::exact_version);
    let preferred = ctx.preferred.get(key);

    let allowed = catalog
        .entries()
        .iter()
        .filter(|entry| reqs.iter().all(|req| req.range.contains(&entry.version)))
        .filter(|entry| pin.map(|pin| pin.contains(&entry.version)).unwrap_or(true))
        .filter(|entry| {
            !ctx.only_stable
                || entry.is_stable()
                || pinned_exact == Some(&entry.version)
                || preferred == Some(&entry.version)
        })
        .map(|entry| entry.version.clone())
        .collect::<Vec<_>>();

    Ok(preference_order(allowed, preferred, ctx.method)
        .iter()
        .filter_map(|version| catalog.entry(version).cloned())
        .collect())
}
