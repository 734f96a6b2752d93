use std::sync::Arc;

use anyhow::{Context, Result};
use hostpack_core::{CatalogClient, Package};
use hostpack_installer::{
    PackageController, PackageStateStore, ResumeRecord, ResumeStore, StorageMode,
};
use hostpack_resolver::{DependencySolver, SolverOptions};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::plan::{plan_operation, OperationPlan, PlanOutcome};
use crate::rollback::rollback;
use crate::{
    Intent, OperationError, OperationInteraction, OperationLock, OperationResult, Preview,
    ROLLBACK_MESSAGE,
};

#[derive(Clone)]
pub struct Controllers {
    host_managed: Arc<dyn PackageController>,
    vendored: Arc<dyn PackageController>,
}

impl Controllers {
    pub fn new(
        host_managed: Arc<dyn PackageController>,
        vendored: Arc<dyn PackageController>,
    ) -> Self {
        Self {
            host_managed,
            vendored,
        }
    }

    pub fn uniform(controller: Arc<dyn PackageController>) -> Self {
        Self {
            host_managed: Arc::clone(&controller),
            vendored: controller,
        }
    }

    pub fn for_mode(&self, mode: StorageMode) -> &dyn PackageController {
        match mode {
            StorageMode::HostManaged => self.host_managed.as_ref(),
            StorageMode::Vendored => self.vendored.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationOptions {
    pub solver: SolverOptions,
    pub confirm: bool,
    pub host_frameworks: Vec<String>,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
            confirm: true,
            host_frameworks: Vec::new(),
        }
    }
}

#[derive(Clone, Copy)]
pub struct OperationServices<'a> {
    pub catalog: &'a dyn CatalogClient,
    pub state: &'a dyn PackageStateStore,
    pub controllers: &'a Controllers,
    pub resume: &'a dyn ResumeStore,
    pub interaction: &'a dyn OperationInteraction,
}

pub struct Operation<'a> {
    intent: Intent,
    services: OperationServices<'a>,
    lock: OperationLock,
    options: OperationOptions,
    executed: bool,
}

impl<'a> Operation<'a> {
    pub fn new(
        intent: Intent,
        services: OperationServices<'a>,
        lock: OperationLock,
        options: OperationOptions,
    ) -> Self {
        Self {
            intent,
            services,
            lock,
            options,
            executed: false,
        }
    }

    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// Runs the operation. Only the first call does anything; later calls
    /// fail with [`OperationError::AlreadyOperated`].
    pub fn execute(&mut self) -> Result<OperationResult, OperationError> {
        if self.executed {
            return Err(OperationError::AlreadyOperated);
        }
        self.executed = true;

        let mut guard = match self.lock.try_acquire(self.intent.label()) {
            Ok(guard) => guard,
            Err(err) => {
                warn!(intent = %self.intent, "{err}");
                return Ok(OperationResult::cancel(err.to_string()));
            }
        };

        info!(intent = %self.intent, "starting operation");
        let result = self.run();
        guard.set_status(result.status);
        info!(intent = %self.intent, status = %result.status, "{}", result.message);
        Ok(result)
    }

    fn run(&self) -> OperationResult {
        let state = self.services.state;
        let snapshot = match state.controlled_packages() {
            Ok(snapshot) => snapshot,
            Err(err) => return failed_before_mutation(OperationError::State(err)),
        };
        let current_mode = match state.storage_mode() {
            Ok(mode) => mode,
            Err(err) => return failed_before_mutation(OperationError::State(err)),
        };

        let pending = if self.intent == Intent::Resume {
            match self.services.resume.take() {
                Ok(pending) => pending,
                Err(err) => return failed_before_mutation(OperationError::State(err)),
            }
        } else {
            None
        };
        let active_mode = pending
            .as_ref()
            .map(|record| record.storage_mode)
            .unwrap_or(current_mode);
        let controller = self.services.controllers.for_mode(active_mode);
        let install_controller = match &self.intent {
            Intent::ConvertStorageMode { target } => self.services.controllers.for_mode(*target),
            _ => controller,
        };

        let solver = DependencySolver::new(self.services.catalog, self.options.solver);
        let plan = match plan_operation(
            &self.intent,
            &snapshot,
            &solver,
            controller,
            pending.as_ref(),
        ) {
            Ok(PlanOutcome::Ready(plan)) => plan,
            Ok(PlanOutcome::DependedUpon { id, by }) => {
                return OperationResult::cancel(format!(
                    "cannot uninstall {id}: depended on by {}",
                    by.join(", ")
                ))
            }
            Ok(PlanOutcome::NotInstalled { id }) => {
                return OperationResult::cancel(format!("{id} is not installed"))
            }
            Err(err @ OperationError::NothingToResume) => {
                return OperationResult::cancel(err.to_string())
            }
            Err(err) => return failed_before_mutation(err),
        };

        if plan.is_noop() {
            // an installed dependency requested by name still becomes a root
            if plan.root != *snapshot.root() {
                if let Err(err) = state.save_roots(&plan.root) {
                    error!(intent = %self.intent, error = %format!("{err:#}"), "failed to record root packages");
                    return OperationResult::failure(format!(
                        "could not record roots for {}",
                        self.intent
                    ));
                }
                info!(roots = plan.root.len(), "recorded root packages");
            }
            return OperationResult::success(self.noop_message(&plan)).with_skipped(plan.skipped);
        }

        let native = native_packages(controller, &plan.delete);
        match self.confirmed(&plan, &native) {
            Ok(true) => {}
            Ok(false) => return OperationResult::cancel("operation cancelled by user"),
            Err(err) => {
                error!(intent = %self.intent, error = %format!("{err:#}"), "confirmation failed");
                return OperationResult::failure(format!("could not prepare {}", self.intent));
            }
        }

        let mut installing = Vec::new();
        let outcome = if native.is_empty() {
            self.apply(&plan, controller, install_controller, &mut installing)
        } else {
            let resume_mode = match &self.intent {
                Intent::ConvertStorageMode { target } => *target,
                _ => active_mode,
            };
            self.remove_for_restart(&plan, controller, &native, resume_mode)
        };

        match outcome {
            Ok(result) => result.with_skipped(plan.skipped),
            Err(err) => {
                error!(intent = %self.intent, error = %format!("{err:#}"), "operation failed; rolling back");
                rollback(install_controller, controller, &installing, &plan.baseline);
                OperationResult::failure(ROLLBACK_MESSAGE)
            }
        }
    }

    fn confirmed(&self, plan: &OperationPlan, native: &[Package]) -> Result<bool> {
        let preview = Preview::build(&self.intent, plan, native, &self.options.host_frameworks);
        for package in &preview.incompatible {
            warn!(package = %package, framework = %package.target_framework, "target framework is not supported by the host");
        }
        if self.intent.suppresses_confirmation() || !self.options.confirm {
            return Ok(true);
        }

        let interaction = self.services.interaction;
        if !interaction.confirm_changes(&preview) {
            return Ok(false);
        }

        for package in &plan.install {
            let reinstall = plan
                .delete
                .iter()
                .any(|deleted| deleted.is_same_id(&package.id) && deleted.version == package.version);
            if reinstall {
                continue;
            }
            let catalog = self
                .services
                .catalog
                .get_catalog(&package.id)
                .with_context(|| format!("failed to load license details for {package}"))?;
            let Some(entry) = catalog.entry(&package.version) else {
                continue;
            };
            if entry.require_license_acceptance
                && !interaction.accept_license(package, entry.license_url.as_deref())
            {
                info!(package = %package, "license declined");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply(
        &self,
        plan: &OperationPlan,
        controller: &dyn PackageController,
        install_controller: &dyn PackageController,
        installing: &mut Vec<Package>,
    ) -> Result<OperationResult> {
        let uninstall_only = plan.uninstall_only();
        let changes = plan.changes();
        let fresh = plan.fresh_installs();
        let total = uninstall_only.len() + changes.len() + fresh.len();
        let mut done = 0;
        let mut native_installed = false;

        for package in uninstall_only {
            self.progress(&format!("uninstalling {package}"), done, total);
            controller
                .uninstall(package)
                .with_context(|| format!("failed to uninstall {package}"))?;
            done += 1;
        }

        for (old, new) in changes {
            self.progress(&format!("replacing {old} with {new}"), done, total);
            controller
                .uninstall(old)
                .with_context(|| format!("failed to uninstall {old}"))?;
            installing.push(new.clone());
            native_installed |= install_controller
                .install(new)
                .with_context(|| format!("failed to install {new}"))?;
            done += 1;
        }

        for package in fresh {
            self.progress(&format!("installing {package}"), done, total);
            installing.push(package.clone());
            native_installed |= install_controller
                .install(package)
                .with_context(|| format!("failed to install {package}"))?;
            done += 1;
        }
        self.progress("done", done, total);

        let state = self.services.state;
        state
            .save_roots(&plan.root)
            .context("failed to record root packages")?;

        if let Intent::ConvertStorageMode { target } = &self.intent {
            state
                .switch_storage_mode(*target)
                .with_context(|| format!("failed to switch storage mode to {target}"))?;
            return Ok(OperationResult::restart_required(format!(
                "converted {} package(s) to {target}; restart the host to finish",
                plan.install.len()
            )));
        }

        let message = self.success_message(plan);
        if native_installed {
            return Ok(OperationResult::restart_required(format!(
                "{message}; restart the host to load native plugins"
            )));
        }
        Ok(OperationResult::success(message))
    }

    /// Native plugins stay locked while the host runs: remove now, persist the
    /// rest of the plan and let the next start finish it.
    fn remove_for_restart(
        &self,
        plan: &OperationPlan,
        controller: &dyn PackageController,
        native: &[Package],
        storage_mode: StorageMode,
    ) -> Result<OperationResult> {
        let total = plan.delete.len();
        for (done, package) in plan.delete.iter().enumerate() {
            self.progress(&format!("uninstalling {package}"), done, total);
            controller
                .uninstall(package)
                .with_context(|| format!("failed to uninstall {package}"))?;
        }

        let record = ResumeRecord {
            install: plan.install.clone(),
            root: plan.root.iter().cloned().collect(),
            rollback: plan.baseline.clone(),
            storage_mode,
        };
        self.services
            .resume
            .save(&record)
            .context("failed to save resume record")?;
        self.services
            .state
            .save_roots(&plan.root)
            .context("failed to record root packages")?;
        if let Intent::ConvertStorageMode { target } = &self.intent {
            self.services.state.switch_storage_mode(*target)?;
        }

        let names = native
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        info!(pending = record.install.len(), "saved resume record");
        Ok(OperationResult::restart_required(format!(
            "removed packages with native plugins ({names}); restart the host to finish"
        )))
    }

    fn progress(&self, step: &str, done: usize, total: usize) {
        self.services.interaction.report_progress(step, done, total);
    }

    fn success_message(&self, plan: &OperationPlan) -> String {
        let requested = plan
            .requested
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match &self.intent {
            Intent::Install { .. } => format!("installed {requested}"),
            Intent::ChangeVersion { id, version } => format!("changed {id} to {version}"),
            Intent::Uninstall { id } => {
                format!("uninstalled {id} ({} package(s) removed)", plan.delete.len())
            }
            Intent::Repair { .. } => format!("repaired {} package(s)", plan.install.len()),
            Intent::ReinstallAll => format!("reinstalled {} package(s)", plan.install.len()),
            Intent::Cleanup => format!("removed {} package(s)", plan.delete.len()),
            Intent::ConvertStorageMode { target } => format!("converted packages to {target}"),
            Intent::Resume => format!(
                "resumed interrupted operation; installed {} package(s)",
                plan.install.len()
            ),
        }
    }

    fn noop_message(&self, plan: &OperationPlan) -> String {
        if !plan.skipped.is_empty() {
            let names = plan
                .skipped
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return format!("{names} is provided by the host; nothing to install");
        }
        match (&self.intent, &plan.requested) {
            (Intent::Install { .. } | Intent::ChangeVersion { .. }, Some(requested)) => {
                format!("{requested} is already installed")
            }
            (Intent::Repair { .. }, _) => "all packages are correctly installed".to_string(),
            _ => "nothing to change".to_string(),
        }
    }
}

fn native_packages(controller: &dyn PackageController, packages: &[Package]) -> Vec<Package> {
    packages
        .par_iter()
        .filter(|package| match controller.has_native(package) {
            Ok(native) => native,
            Err(err) => {
                warn!(package = %package, error = %format!("{err:#}"), "native probe failed; treating as native");
                true
            }
        })
        .cloned()
        .collect()
}

fn failed_before_mutation(err: OperationError) -> OperationResult {
    error!(error = %err, "operation could not start");
    OperationResult::failure(err.to_string())
}
