use super::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use hostpack_core::{
    parse_version, CatalogEntry, ControlledPackages, Package, PackageDependency,
    VersionSelectMethod, VersionSet,
};
use hostpack_installer::{PackageController, PackageStateStore, ResumeRecord, ResumeStore, StorageMode};
use hostpack_registry::MemoryCatalog;
use hostpack_resolver::{DependencySolver, SolverOptions};
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct World {
    existing: Vec<Package>,
    installed: BTreeMap<String, Package>,
    roots: BTreeSet<String>,
    /// `id@version` strings whose payload carries native plugins.
    native: BTreeSet<String>,
    broken: BTreeSet<String>,
    placed: BTreeMap<String, StorageMode>,
    fail_install_at: Option<usize>,
    install_calls: usize,
    mode: StorageMode,
    log: Vec<String>,
}

#[derive(Debug, Clone)]
struct FakeHost {
    world: Arc<Mutex<World>>,
    mode: StorageMode,
}

impl FakeHost {
    fn world(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().expect("world lock")
    }
}

impl PackageController for FakeHost {
    fn install(&self, package: &Package) -> Result<bool> {
        let mut world = self.world();
        world.install_calls += 1;
        if world.fail_install_at == Some(world.install_calls) {
            bail!("injected failure installing {package}");
        }
        world.installed.insert(package.key(), package.clone());
        world.broken.remove(&package.key());
        world.placed.insert(package.key(), self.mode);
        world.log.push(format!("install {package}"));
        Ok(world.native.contains(&package.to_string()))
    }

    fn uninstall(&self, package: &Package) -> Result<()> {
        let mut world = self.world();
        world.installed.remove(&package.key());
        world.placed.remove(&package.key());
        world.log.push(format!("uninstall {package}"));
        Ok(())
    }

    fn is_correctly_installed(&self, package: &Package) -> Result<bool> {
        let world = self.world();
        Ok(world
            .installed
            .get(&package.key())
            .map(|installed| installed.version == package.version)
            .unwrap_or(false)
            && !world.broken.contains(&package.key()))
    }

    fn has_native(&self, package: &Package) -> Result<bool> {
        let world = self.world();
        Ok(world.native.contains(&package.to_string())
            && world.installed.contains_key(&package.key()))
    }
}

impl PackageStateStore for FakeHost {
    fn controlled_packages(&self) -> Result<ControlledPackages> {
        let world = self.world();
        ControlledPackages::new(
            world.existing.clone(),
            world.installed.values().cloned(),
            world.roots.iter().cloned(),
        )
    }

    fn save_roots(&self, roots: &BTreeSet<String>) -> Result<()> {
        let mut world = self.world();
        let kept = roots
            .iter()
            .filter(|key| world.installed.contains_key(*key))
            .cloned()
            .collect();
        world.roots = kept;
        Ok(())
    }

    fn storage_mode(&self) -> Result<StorageMode> {
        Ok(self.world().mode)
    }

    fn switch_storage_mode(&self, mode: StorageMode) -> Result<()> {
        self.world().mode = mode;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FakeResume {
    record: Mutex<Option<ResumeRecord>>,
}

impl FakeResume {
    fn pending(&self) -> Option<ResumeRecord> {
        self.record.lock().expect("resume lock").clone()
    }
}

impl ResumeStore for FakeResume {
    fn save(&self, record: &ResumeRecord) -> Result<()> {
        *self.record.lock().expect("resume lock") = Some(record.clone());
        Ok(())
    }

    fn take(&self) -> Result<Option<ResumeRecord>> {
        Ok(self.record.lock().expect("resume lock").take())
    }

    fn has_pending(&self) -> Result<bool> {
        Ok(self.pending().is_some())
    }
}

#[derive(Debug)]
struct ScriptedInteraction {
    confirm: bool,
    accept_license: bool,
    previews: Mutex<Vec<Preview>>,
    licenses: Mutex<Vec<String>>,
    progress_calls: AtomicUsize,
}

impl Default for ScriptedInteraction {
    fn default() -> Self {
        Self {
            confirm: true,
            accept_license: true,
            previews: Mutex::default(),
            licenses: Mutex::default(),
            progress_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedInteraction {
    fn previews(&self) -> Vec<Preview> {
        self.previews.lock().expect("previews lock").clone()
    }
}

impl OperationInteraction for ScriptedInteraction {
    fn confirm_changes(&self, preview: &Preview) -> bool {
        self.previews
            .lock()
            .expect("previews lock")
            .push(preview.clone());
        self.confirm
    }

    fn accept_license(&self, package: &Package, license_url: Option<&str>) -> bool {
        self.licenses
            .lock()
            .expect("licenses lock")
            .push(format!("{package} {}", license_url.unwrap_or("-")));
        self.accept_license
    }

    fn report_progress(&self, _step: &str, _done: usize, _total: usize) {
        self.progress_calls.fetch_add(1, Ordering::Relaxed);
    }
}

struct Harness {
    host: FakeHost,
    controllers: Controllers,
    catalog: MemoryCatalog,
    resume: FakeResume,
    interaction: ScriptedInteraction,
    lock: OperationLock,
    options: OperationOptions,
}

impl Harness {
    fn new(entries: Vec<CatalogEntry>) -> Self {
        let world = Arc::new(Mutex::new(World::default()));
        let host = FakeHost {
            world: Arc::clone(&world),
            mode: StorageMode::HostManaged,
        };
        let vendored = FakeHost {
            world,
            mode: StorageMode::Vendored,
        };
        Self {
            controllers: Controllers::new(Arc::new(host.clone()), Arc::new(vendored)),
            host,
            catalog: entries
                .into_iter()
                .fold(MemoryCatalog::new(), MemoryCatalog::with_entry),
            resume: FakeResume::default(),
            interaction: ScriptedInteraction::default(),
            lock: OperationLock::new(),
            options: OperationOptions::default(),
        }
    }

    fn seed(self, installed: Vec<Package>, roots: &[&str]) -> Self {
        {
            let mut world = self.host.world();
            for package in installed {
                world.installed.insert(package.key(), package);
            }
            world.roots = roots.iter().map(|root| root.to_ascii_lowercase()).collect();
        }
        self
    }

    fn operation(&self, intent: Intent) -> Operation<'_> {
        Operation::new(
            intent,
            OperationServices {
                catalog: &self.catalog,
                state: &self.host,
                controllers: &self.controllers,
                resume: &self.resume,
                interaction: &self.interaction,
            },
            self.lock.clone(),
            self.options.clone(),
        )
    }

    fn run(&self, intent: Intent) -> OperationResult {
        self.operation(intent)
            .execute()
            .expect("first execute must run")
    }

    fn installed(&self) -> Vec<String> {
        self.host
            .world()
            .installed
            .values()
            .map(ToString::to_string)
            .collect()
    }

    fn roots(&self) -> Vec<String> {
        self.host.world().roots.iter().cloned().collect()
    }

    fn log(&self) -> Vec<String> {
        self.host.world().log.clone()
    }
}

fn v(raw: &str) -> semver::Version {
    parse_version(raw).expect("version must parse")
}

fn entry(id: &str, version: &str, dependencies: &[(&str, &str)]) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        version: v(version),
        target_framework: String::new(),
        dependencies: dependencies
            .iter()
            .map(|(dep_id, range)| {
                PackageDependency::new(*dep_id, VersionSet::parse(range).expect("range"))
            })
            .collect(),
        require_license_acceptance: false,
        license_url: None,
    }
}

fn pkg(id: &str, version: &str, dependencies: &[(&str, &str)]) -> Package {
    entry(id, version, dependencies).to_package()
}

fn install(id: &str, version: Option<&str>) -> Intent {
    Intent::Install {
        id: id.to_string(),
        version: version.map(v),
    }
}

fn change(id: &str, version: &str) -> Intent {
    Intent::ChangeVersion {
        id: id.to_string(),
        version: v(version),
    }
}

#[test]
fn install_adds_only_the_new_package_over_compatible_installed_set() {
    let h = Harness::new(vec![
        entry("A", "1.0", &[]),
        entry("A", "1.5", &[]),
        entry("B", "2.0", &[("A", ">=1.0, <2.0")]),
    ])
    .seed(vec![pkg("A", "1.0", &[])], &["A"]);

    let snapshot = h.host.controlled_packages().expect("must snapshot");
    let solver = DependencySolver::new(&h.catalog, SolverOptions::default());
    let PlanOutcome::Ready(plan) = plan_operation(
        &install("B", Some("2.0")),
        &snapshot,
        &solver,
        &h.host,
        None,
    )
    .expect("must plan") else {
        panic!("plan must be ready");
    };
    assert_eq!(plan.install, vec![pkg("B", "2.0", &[])]);
    assert!(plan.delete.is_empty());
    assert_eq!(
        plan.root,
        BTreeSet::from(["a".to_string(), "b".to_string()])
    );

    let result = h.run(install("B", Some("2.0")));
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.message, "installed B@2.0.0");
    assert_eq!(h.installed(), vec!["A@1.0.0", "B@2.0.0"]);
    assert_eq!(h.roots(), vec!["a", "b"]);
    assert_eq!(h.log(), vec!["install B@2.0.0"]);

    let previews = h.interaction.previews();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].added, vec![pkg("B", "2.0", &[])]);
    assert!(previews[0].removed.is_empty());
    assert_eq!(h.lock.last_status(), Some(OperationStatus::Success));
    assert!(!h.lock.is_held());
}

#[test]
fn change_version_blocked_by_installed_dependent_fails_without_mutation() {
    let h = Harness::new(vec![
        entry("A", "1.0", &[]),
        entry("A", "2.0", &[]),
        entry("B", "1.0", &[("A", "<2.0")]),
    ])
    .seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "<2.0")])],
        &["A"],
    );

    let result = h.run(change("A", "2.0"));
    assert_eq!(result.status, OperationStatus::Failure);
    assert!(result.message.contains("no version of"), "{}", result.message);
    assert!(h.log().is_empty());
    assert_eq!(h.installed(), vec!["A@1.0.0", "B@1.0.0"]);
}

#[test]
fn change_version_upgrades_dependent_together() {
    let h = Harness::new(vec![
        entry("A", "1.0", &[]),
        entry("A", "2.0", &[]),
        entry("B", "1.0", &[("A", "<2.0")]),
        entry("B", "1.1", &[("A", ">=2.0")]),
    ])
    .seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "<2.0")])],
        &["A"],
    );

    let result = h.run(change("A", "2.0"));
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.message, "changed A to 2.0.0");
    assert_eq!(h.installed(), vec!["A@2.0.0", "B@1.1.0"]);
    assert_eq!(
        h.log(),
        vec![
            "uninstall A@1.0.0",
            "install A@2.0.0",
            "uninstall B@1.0.0",
            "install B@1.1.0",
        ]
    );
}

#[test]
fn uninstall_of_dependency_still_needed_is_cancelled() {
    let h = Harness::new(Vec::new()).seed(
        vec![pkg("A", "1.0", &[]), pkg("C", "1.0", &[("A", "1.0")])],
        &["A", "C"],
    );

    let result = h.run(Intent::Uninstall {
        id: "A".to_string(),
    });
    assert_eq!(result.status, OperationStatus::Cancel);
    assert_eq!(result.message, "cannot uninstall A: depended on by C");
    assert!(h.log().is_empty());
    assert!(h.interaction.previews().is_empty());
}

#[test]
fn strict_pin_conflict_is_reported_without_substitution() {
    let mut h = Harness::new(vec![
        entry("A", "1.0", &[]),
        entry("A", "2.0", &[]),
        entry("B", "1.0", &[("A", "[1.0, 2.0)")]),
        entry("B", "1.1", &[("A", ">=2.0")]),
    ])
    .seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "[1.0, 2.0)")])],
        &["B"],
    );
    h.options.solver.method = VersionSelectMethod::Strict;

    let result = h.run(install("A", Some("2.0")));
    assert_eq!(result.status, OperationStatus::Failure);
    assert!(h.log().is_empty());
    assert_eq!(h.installed(), vec!["A@1.0.0", "B@1.0.0"]);
}

#[test]
fn uninstall_prunes_orphaned_dependencies_dependents_first() {
    let h = Harness::new(Vec::new()).seed(
        vec![
            pkg("app", "1.0", &[("lib", "1.0")]),
            pkg("lib", "1.0", &[]),
            pkg("tool", "1.0", &[]),
        ],
        &["app", "tool"],
    );

    let result = h.run(Intent::Uninstall {
        id: "app".to_string(),
    });
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(h.log(), vec!["uninstall app@1.0.0", "uninstall lib@1.0.0"]);
    assert_eq!(h.installed(), vec!["tool@1.0.0"]);
    assert_eq!(h.roots(), vec!["tool"]);
}

#[test]
fn uninstall_unknown_package_is_cancelled() {
    let h = Harness::new(Vec::new());
    let result = h.run(Intent::Uninstall {
        id: "ghost".to_string(),
    });
    assert_eq!(result.status, OperationStatus::Cancel);
    assert_eq!(result.message, "ghost is not installed");
}

#[test]
fn busy_lock_cancels_without_touching_state() {
    let h = Harness::new(vec![entry("A", "1.0", &[])]);
    let guard = h.lock.try_acquire("other").expect("must acquire");

    let result = h.run(install("A", None));
    assert_eq!(result.status, OperationStatus::Cancel);
    assert_eq!(result.message, "another operation is in progress (other)");
    assert!(h.installed().is_empty());

    drop(guard);
    assert!(!h.lock.is_held());
    assert_eq!(h.run(install("A", None)).status, OperationStatus::Success);
}

#[test]
fn marker_lock_excludes_other_lock_instances() {
    let marker = std::env::temp_dir().join(format!(
        "hostpack-operation-tests-{}-{}.lock",
        std::process::id(),
        TEST_MARKER_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let first = OperationLock::with_marker(&marker);
    let second = OperationLock::with_marker(&marker);

    let guard = first.try_acquire("install").expect("must acquire");
    let err = second
        .try_acquire("cleanup")
        .expect_err("second lock must be refused");
    assert!(matches!(err, OperationError::LockUnavailable { .. }));

    drop(guard);
    assert!(!marker.exists());
    drop(second.try_acquire("cleanup").expect("must acquire after release"));
}

static TEST_MARKER_COUNTER: AtomicU64 = AtomicU64::new(0);

#[test]
fn second_execute_is_rejected() {
    let h = Harness::new(vec![entry("A", "1.0", &[])]);
    let mut operation = h.operation(install("A", None));

    let first = operation.execute().expect("first execute must run");
    assert_eq!(first.status, OperationStatus::Success);
    let err = operation.execute().expect_err("second execute must fail");
    assert!(matches!(err, OperationError::AlreadyOperated));
    assert_eq!(h.log(), vec!["install A@1.0.0"]);
}

#[test]
fn declined_confirmation_cancels_without_mutation() {
    let mut h = Harness::new(vec![entry("A", "1.0", &[])]);
    h.interaction.confirm = false;

    let result = h.run(install("A", None));
    assert_eq!(result.status, OperationStatus::Cancel);
    assert!(h.log().is_empty());
    assert_eq!(h.lock.last_status(), Some(OperationStatus::Cancel));
}

#[test]
fn license_prompt_gates_installation() {
    let licensed = CatalogEntry {
        require_license_acceptance: true,
        license_url: Some("https://licenses.test/eula".to_string()),
        ..entry("Licensed", "1.0", &[])
    };

    let mut declined = Harness::new(vec![licensed.clone()]);
    declined.interaction.accept_license = false;
    let result = declined.run(install("Licensed", None));
    assert_eq!(result.status, OperationStatus::Cancel);
    assert!(declined.log().is_empty());

    let accepted = Harness::new(vec![licensed]);
    let result = accepted.run(install("Licensed", None));
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(
        accepted
            .interaction
            .licenses
            .lock()
            .expect("licenses lock")
            .clone(),
        vec!["Licensed@1.0.0 https://licenses.test/eula"]
    );
}

#[test]
fn confirmation_can_be_disabled() {
    let mut h = Harness::new(vec![entry("A", "1.0", &[])]);
    h.options.confirm = false;
    h.interaction.confirm = false;

    assert_eq!(h.run(install("A", None)).status, OperationStatus::Success);
    assert!(h.interaction.previews().is_empty());
}

#[test]
fn failed_install_at_any_step_restores_original_state() {
    let catalog = vec![
        entry("core", "1.0", &[]),
        entry(
            "app",
            "1.0",
            &[("lib1", "1.0"), ("lib2", "1.0"), ("lib3", "1.0")],
        ),
        entry("lib1", "1.0", &[]),
        entry("lib2", "1.0", &[]),
        entry("lib3", "1.0", &[]),
    ];

    for step in 1..=4 {
        let h = Harness::new(catalog.clone()).seed(vec![pkg("core", "1.0", &[])], &["core"]);
        h.host.world().fail_install_at = Some(step);

        let result = h.run(install("app", None));
        assert_eq!(result.status, OperationStatus::Failure, "step {step}");
        assert_eq!(result.message, ROLLBACK_MESSAGE);
        assert_eq!(h.installed(), vec!["core@1.0.0"], "step {step}");
        assert_eq!(h.roots(), vec!["core"], "step {step}");
        assert_eq!(h.lock.last_status(), Some(OperationStatus::Failure));
    }
}

#[test]
fn failed_version_swap_reinstalls_previous_version() {
    let h = Harness::new(vec![entry("A", "1.0", &[]), entry("A", "2.0", &[])])
        .seed(vec![pkg("A", "1.0", &[])], &["A"]);
    h.host.world().fail_install_at = Some(1);

    let result = h.run(change("A", "2.0"));
    assert_eq!(result.status, OperationStatus::Failure);
    assert_eq!(h.installed(), vec!["A@1.0.0"]);
    assert_eq!(
        h.log(),
        vec!["uninstall A@1.0.0", "uninstall A@2.0.0", "install A@1.0.0"]
    );
}

#[test]
fn repair_reinstalls_broken_packages_once() {
    let h = Harness::new(Vec::new()).seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "1.0")])],
        &["B"],
    );
    h.host.world().broken.insert("b".to_string());

    let first = h.run(Intent::Repair { id: None });
    assert_eq!(first.status, OperationStatus::Success);
    assert_eq!(first.message, "repaired 1 package(s)");
    assert_eq!(h.log(), vec!["uninstall B@1.0.0", "install B@1.0.0"]);

    let second = h.run(Intent::Repair { id: None });
    assert_eq!(second.status, OperationStatus::Success);
    assert_eq!(second.message, "all packages are correctly installed");
    assert_eq!(h.log().len(), 2);
    assert_eq!(h.roots(), vec!["b"]);
}

#[test]
fn repair_of_missing_package_is_cancelled() {
    let h = Harness::new(Vec::new());
    let result = h.run(Intent::Repair {
        id: Some("ghost".to_string()),
    });
    assert_eq!(result.status, OperationStatus::Cancel);
}

#[test]
fn native_removal_defers_installs_until_resume() {
    let h = Harness::new(vec![entry("N", "1.0", &[]), entry("N", "2.0", &[])])
        .seed(vec![pkg("N", "1.0", &[])], &["N"]);
    h.host.world().native.insert("N@1.0.0".to_string());

    let result = h.run(change("N", "2.0"));
    assert_eq!(result.status, OperationStatus::RestartRequired);
    assert!(h.installed().is_empty());
    let record = h.resume.pending().expect("resume record must be saved");
    assert_eq!(record.install, vec![pkg("N", "2.0", &[])]);
    assert_eq!(record.root, vec!["n"]);
    assert_eq!(record.rollback, vec![pkg("N", "1.0", &[])]);
    assert_eq!(h.lock.last_status(), Some(OperationStatus::RestartRequired));

    let resumed = h.run(Intent::Resume);
    assert_eq!(resumed.status, OperationStatus::Success);
    assert_eq!(h.installed(), vec!["N@2.0.0"]);
    assert_eq!(h.roots(), vec!["n"]);
    assert!(h.resume.pending().is_none());

    let nothing = h.run(Intent::Resume);
    assert_eq!(nothing.status, OperationStatus::Cancel);
    assert_eq!(nothing.message, "no interrupted operation to resume");
}

#[test]
fn failed_resume_restores_recorded_rollback_set() {
    let h = Harness::new(Vec::new());
    h.resume
        .save(&ResumeRecord {
            install: vec![pkg("N", "2.0", &[])],
            root: vec!["n".to_string()],
            rollback: vec![pkg("N", "1.0", &[])],
            storage_mode: StorageMode::HostManaged,
        })
        .expect("must save record");
    h.host.world().fail_install_at = Some(1);

    let result = h.run(Intent::Resume);
    assert_eq!(result.status, OperationStatus::Failure);
    assert_eq!(h.installed(), vec!["N@1.0.0"]);
}

#[test]
fn installing_native_package_requires_restart() {
    let h = Harness::new(vec![entry("N", "1.0", &[])]);
    h.host.world().native.insert("N@1.0.0".to_string());

    let result = h.run(install("N", None));
    assert_eq!(result.status, OperationStatus::RestartRequired);
    assert_eq!(h.installed(), vec!["N@1.0.0"]);
    assert!(h.resume.pending().is_none());
}

#[test]
fn install_of_host_provided_package_is_skipped() {
    let h = Harness::new(vec![entry("Host.Core", "9.0", &[])]);
    h.host.world().existing.push(pkg("Host.Core", "5.0", &[]));

    let result = h.run(install("host.core", None));
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.skipped, vec![pkg("Host.Core", "5.0", &[])]);
    assert!(result.message.contains("provided by the host"));
    assert!(h.log().is_empty());
}

#[test]
fn installing_present_dependency_promotes_it_to_root() {
    let h = Harness::new(vec![
        entry("A", "1.0", &[]),
        entry("B", "1.0", &[("A", "1.0")]),
    ])
    .seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "1.0")])],
        &["B"],
    );

    let result = h.run(install("A", Some("1.0")));
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.message, "A@1.0.0 is already installed");
    assert_eq!(h.roots(), vec!["a", "b"]);
    assert!(h.log().is_empty());

    let result = h.run(Intent::Uninstall { id: "B".to_string() });
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(h.installed(), vec!["A@1.0.0"]);
    assert_eq!(h.roots(), vec!["a"]);
}

#[test]
fn reinstall_all_rebuilds_roots_and_drops_orphans() {
    let h = Harness::new(vec![
        entry("app", "1.0", &[("lib", "1.0")]),
        entry("lib", "1.0", &[]),
        entry("old", "0.1", &[]),
    ])
    .seed(
        vec![
            pkg("app", "1.0", &[("lib", "1.0")]),
            pkg("lib", "1.0", &[]),
            pkg("old", "0.1", &[]),
        ],
        &["app"],
    );

    let result = h.run(Intent::ReinstallAll);
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.message, "reinstalled 2 package(s)");
    assert_eq!(h.installed(), vec!["app@1.0.0", "lib@1.0.0"]);
    assert_eq!(h.roots(), vec!["app"]);
}

#[test]
fn cleanup_removes_everything_without_prompting() {
    let h = Harness::new(Vec::new()).seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "1.0")])],
        &["B"],
    );

    let result = h.run(Intent::Cleanup);
    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(result.message, "removed 2 package(s)");
    assert!(h.installed().is_empty());
    assert!(h.roots().is_empty());
    assert!(h.interaction.previews().is_empty());
    assert_eq!(h.log(), vec!["uninstall B@1.0.0", "uninstall A@1.0.0"]);
}

#[test]
fn convert_moves_every_package_and_switches_mode() {
    let h = Harness::new(Vec::new()).seed(
        vec![pkg("A", "1.0", &[]), pkg("B", "1.0", &[("A", "1.0")])],
        &["B"],
    );

    let result = h.run(Intent::ConvertStorageMode {
        target: StorageMode::Vendored,
    });
    assert_eq!(result.status, OperationStatus::RestartRequired);
    assert!(h.interaction.previews().is_empty());

    let world = h.host.world();
    assert_eq!(world.mode, StorageMode::Vendored);
    assert_eq!(world.installed.len(), 2);
    assert!(world
        .placed
        .values()
        .all(|mode| *mode == StorageMode::Vendored));
    assert_eq!(
        world.roots.iter().cloned().collect::<Vec<_>>(),
        vec!["b"]
    );
}

#[test]
fn preview_flags_incompatible_frameworks_and_native_removals() {
    let mut h = Harness::new(vec![
        CatalogEntry {
            target_framework: "net8.0".to_string(),
            ..entry("Modern", "2.0", &[])
        },
        entry("Modern", "1.0", &[]),
    ])
    .seed(vec![pkg("Modern", "1.0", &[])], &["Modern"]);
    h.options.host_frameworks = vec!["netstandard2.1".to_string()];
    h.interaction.confirm = false;

    let result = h.run(change("Modern", "2.0"));
    assert_eq!(result.status, OperationStatus::Cancel);

    let previews = h.interaction.previews();
    assert_eq!(previews.len(), 1);
    let preview = &previews[0];
    assert_eq!(preview.incompatible.len(), 1);
    assert!(preview.has_warnings());
    assert_eq!(
        render_preview_lines(preview),
        vec![
            "change Modern to 2.0.0:".to_string(),
            "  ~ Modern 1.0.0 -> 2.0.0".to_string(),
            "  ! Modern@2.0.0 targets 'net8.0', which this host does not list".to_string(),
        ]
    );
}

#[test]
fn render_preview_lists_every_section() {
    let preview = Preview {
        intent: "repair all packages".to_string(),
        added: vec![pkg("New", "1.0", &[])],
        removed: vec![pkg("Old", "0.1", &[])],
        changed: vec![(pkg("Lib", "1.0", &[]), pkg("Lib", "1.0", &[]))],
        native: vec![pkg("Old", "0.1", &[])],
        incompatible: Vec::new(),
        skipped: vec![pkg("Host", "5.0", &[])],
    };

    assert_eq!(
        render_preview_lines(&preview),
        vec![
            "repair all packages:",
            "  + New@1.0.0",
            "  ~ Lib@1.0.0 (reinstall)",
            "  - Old@0.1.0",
            "  = Host@5.0.0 is provided by the host; skipped",
            "  ! Old@0.1.0 contains native plugins; the host must restart to finish",
        ]
    );
}

#[test]
fn progress_is_reported_for_each_mutation() {
    let h = Harness::new(vec![entry("A", "1.0", &[]), entry("B", "1.0", &[("A", "1.0")])]);

    assert_eq!(h.run(install("B", None)).status, OperationStatus::Success);
    assert_eq!(h.interaction.progress_calls.load(Ordering::Relaxed), 3);
}
