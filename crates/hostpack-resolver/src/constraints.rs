use std::collections::BTreeMap;

use hostpack_core::{Package, VersionSet};

use crate::types::Constraint;

pub(crate) fn first_unsatisfied(
    selected: &BTreeMap<String, Package>,
    constraints: &BTreeMap<String, Vec<Constraint>>,
    pins: &BTreeMap<String, VersionSet>,
) -> Option<String> {
    for (key, package) in selected {
        if let Some(reqs) = constraints.get(key) {
            if !reqs.iter().all(|req| req.range.contains(&package.version)) {
                return Some(key.clone());
            }
        }
        if let Some(pin) = pins.get(key) {
            if !pin.contains(&package.version) {
                return Some(key.clone());
            }
        }
    }
    None
}

pub(crate) fn describe_constraints(reqs: &[Constraint], pin: Option<&VersionSet>) -> String {
    let mut parts = reqs
        .iter()
        .filter(|req| !req.range.is_any())
        .map(|req| format!("{} (required by {})", req.range, req.required_by))
        .collect::<Vec<_>>();
    if let Some(pin) = pin {
        parts.push(format!("{pin} (pinned)"));
    }
    if parts.is_empty() {
        return "[*]".to_string();
    }
    format!("[{}]", parts.join(" && "))
}
