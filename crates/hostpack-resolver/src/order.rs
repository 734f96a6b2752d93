use std::collections::{BTreeMap, BTreeSet};

use hostpack_core::Package;

/// Dependencies-first ordering of the selected packages. A dependency
/// cycle is placed as a unit, smallest key first, once everything it
/// depends on outside the cycle is placed.
pub fn install_order(selected: &BTreeMap<String, Package>) -> Vec<String> {
    let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for key in selected.keys() {
        deps.insert(key.clone(), BTreeSet::new());
        reverse.insert(key.clone(), BTreeSet::new());
    }

    for (key, package) in selected {
        for dependency in &package.dependencies {
            let dep_key = dependency.key();
            if !selected.contains_key(&dep_key) || dep_key == *key {
                continue;
            }
            deps.entry(key.clone())
                .or_default()
                .insert(dep_key.clone());
            reverse.entry(dep_key).or_default().insert(key.clone());
        }
    }

    let mut placement = Placement {
        in_degree: deps
            .iter()
            .map(|(key, dependency_set)| (key.clone(), dependency_set.len()))
            .collect(),
        reverse: &reverse,
        ready: BTreeSet::new(),
        placed: BTreeSet::new(),
        ordered: Vec::with_capacity(selected.len()),
    };
    placement.ready = placement
        .in_degree
        .iter()
        .filter_map(|(key, degree)| (*degree == 0).then_some(key.clone()))
        .collect();

    loop {
        while let Some(next) = placement.ready.pop_first() {
            placement.place(next);
        }

        if placement.ordered.len() == selected.len() {
            break;
        }
        // everything left waits on something else; a cycle with no
        // unplaced dependency outside itself goes next
        match closed_cycle(&deps, &placement.placed) {
            Some(cycle) => {
                for key in cycle {
                    placement.place(key);
                }
            }
            None => break,
        }
    }

    placement.ordered
}

struct Placement<'a> {
    in_degree: BTreeMap<String, usize>,
    reverse: &'a BTreeMap<String, BTreeSet<String>>,
    ready: BTreeSet<String>,
    placed: BTreeSet<String>,
    ordered: Vec<String>,
}

impl Placement<'_> {
    fn place(&mut self, key: String) {
        if !self.placed.insert(key.clone()) {
            return;
        }
        if let Some(children) = self.reverse.get(&key) {
            for child in children {
                if let Some(degree) = self.in_degree.get_mut(child) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 && !self.placed.contains(child) {
                        self.ready.insert(child.clone());
                    }
                }
            }
        }
        self.ordered.push(key);
    }
}

fn closed_cycle(
    deps: &BTreeMap<String, BTreeSet<String>>,
    placed: &BTreeSet<String>,
) -> Option<BTreeSet<String>> {
    deps.keys()
        .filter(|key| !placed.contains(*key))
        .find_map(|key| {
            let reach = unplaced_reach(key, deps, placed);
            let closed = reach
                .iter()
                .all(|other| unplaced_reach(other, deps, placed).contains(key));
            closed.then(|| {
                let mut cycle = reach;
                cycle.insert(key.clone());
                cycle
            })
        })
}

fn unplaced_reach(
    start: &str,
    deps: &BTreeMap<String, BTreeSet<String>>,
    placed: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(next) = stack.pop() {
        let Some(children) = deps.get(&next) else {
            continue;
        };
        for child in children {
            if !placed.contains(child) && seen.insert(child.clone()) {
                stack.push(child.clone());
            }
        }
    }
    seen
}
