use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use hostpack_core::{parse_version, CatalogClient, CatalogEntry, VersionSelectMethod};
use hostpack_installer::{
    clear_operation_marker, read_install_receipts, read_operation_marker, FileResumeStore,
    FsPackageController, FsStateStore, HostConfig, InstallReason, InstallReceipt, PrefixLayout,
    ResumeStore, StorageMode,
};
use hostpack_operation::{
    Controllers, Intent, Operation, OperationLock, OperationOptions, OperationResult,
    OperationServices,
};
use hostpack_registry::{MemoryCatalog, RegistryIndex};
use hostpack_resolver::SolverOptions;
use semver::Version;
use tracing::warn;

use crate::interaction::TerminalInteraction;
use crate::render::{
    current_output_style, exit_code_for, format_result_lines, render_status_line, OutputStyle,
};
use crate::staging::StagingController;
use crate::{Cli, Commands};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) registry_root: Option<PathBuf>,
    pub(crate) method: VersionSelectMethod,
    pub(crate) only_stable: bool,
    pub(crate) host_frameworks: Vec<String>,
    pub(crate) assume_yes: bool,
}

pub(crate) fn resolve_settings(
    project: &Path,
    config: HostConfig,
    registry_root: Option<PathBuf>,
    method: Option<VersionSelectMethod>,
    allow_prerelease: bool,
    assume_yes: bool,
) -> Settings {
    // relative registry paths in config.toml are anchored at the project
    let configured_root = config.registry_root.map(|root| {
        if root.is_relative() {
            project.join(root)
        } else {
            root
        }
    });
    Settings {
        registry_root: registry_root.or(configured_root),
        method: method.unwrap_or(config.method),
        only_stable: config.only_stable && !allow_prerelease,
        host_frameworks: config.host_frameworks,
        assume_yes,
    }
}

pub(crate) fn run_cli(cli: Cli) -> Result<ExitCode> {
    let Cli {
        project,
        registry_root,
        method,
        allow_prerelease,
        yes,
        command,
        ..
    } = cli;

    let project = match project {
        Some(project) => project,
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };
    let layout = PrefixLayout::new(project);
    let config = HostConfig::load(&layout.config_path())?;
    let settings = resolve_settings(
        layout.project(),
        config,
        registry_root,
        method,
        allow_prerelease,
        yes,
    );
    let style = current_output_style();

    if let Some(intent) = intent_for(&command)? {
        return run_intent(&layout, &settings, intent, style);
    }

    match command {
        Commands::List => {
            let receipts = read_install_receipts(&layout)?;
            for line in format_list_lines(&receipts) {
                println!("{line}");
            }
        }
        Commands::Search { query } => {
            let registry = open_registry(&settings)?;
            let names = registry.search_names(&query)?;
            if names.is_empty() {
                println!("no packages match '{query}'");
            }
            for name in names {
                println!("{name}");
            }
        }
        Commands::Info { id } => {
            let registry = open_registry(&settings)?;
            let versions = registry.package_versions(&id)?;
            if versions.is_empty() {
                println!("No package found: {id}");
            } else {
                for line in format_info_lines(&id, &versions) {
                    println!("{line}");
                }
            }
        }
        Commands::Unlock => {
            let (status, message) = unlock(&layout.lock_path())?;
            println!("{}", render_status_line(style, status, &message));
        }
        other => bail!("unexpected command {other:?}"),
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn intent_for(command: &Commands) -> Result<Option<Intent>> {
    let intent = match command {
        Commands::Install { spec } => {
            let (id, version) = parse_spec(spec)?;
            Intent::Install { id, version }
        }
        Commands::Change { id, version } => Intent::ChangeVersion {
            id: id.trim().to_string(),
            version: parse_version(version)
                .with_context(|| format!("invalid version '{version}' for {id}"))?,
        },
        Commands::Uninstall { id } => Intent::Uninstall {
            id: id.trim().to_string(),
        },
        Commands::Repair { id } => Intent::Repair {
            id: id.as_ref().map(|id| id.trim().to_string()),
        },
        Commands::ReinstallAll => Intent::ReinstallAll,
        Commands::Cleanup => Intent::Cleanup,
        Commands::Convert { mode } => Intent::ConvertStorageMode { target: *mode },
        Commands::Resume => Intent::Resume,
        Commands::List | Commands::Search { .. } | Commands::Info { .. } | Commands::Unlock => {
            return Ok(None)
        }
    };
    Ok(Some(intent))
}

pub(crate) fn parse_spec(spec: &str) -> Result<(String, Option<Version>)> {
    let (id, version) = match spec.trim().split_once('@') {
        Some((id, version)) => (id.trim(), Some(version.trim())),
        None => (spec.trim(), None),
    };
    if id.is_empty() {
        return Err(anyhow!("package id must not be empty: '{spec}'"));
    }
    let version = version
        .map(|raw| parse_version(raw).with_context(|| format!("invalid version in '{spec}'")))
        .transpose()?;
    Ok((id.to_string(), version))
}

/// Removes the operation marker unless its owner is still running.
pub(crate) fn unlock(marker_path: &Path) -> Result<(&'static str, String)> {
    let Some(marker) = read_operation_marker(marker_path)? else {
        if marker_path.exists() {
            clear_operation_marker(marker_path)?;
            return Ok(("ok", "unlock: cleared unreadable operation marker".to_string()));
        }
        return Ok(("step", "unlock: no action needed".to_string()));
    };
    if marker.owner_alive() == Some(true) {
        bail!("operation marker is held by running process {marker}");
    }

    clear_operation_marker(marker_path)?;
    warn!(holder = %marker, "cleared operation marker");
    Ok(("ok", format!("unlock: cleared marker held by {marker}")))
}

fn needs_catalog(intent: &Intent) -> bool {
    matches!(
        intent,
        Intent::Install { .. } | Intent::ChangeVersion { .. } | Intent::ReinstallAll
    )
}

fn open_registry(settings: &Settings) -> Result<RegistryIndex> {
    settings
        .registry_root
        .as_ref()
        .map(RegistryIndex::open)
        .ok_or_else(|| {
            anyhow!("no registry configured; pass --registry-root or set registry_root in config.toml")
        })
}

fn run_intent(
    layout: &PrefixLayout,
    settings: &Settings,
    intent: Intent,
    style: OutputStyle,
) -> Result<ExitCode> {
    let interaction = TerminalInteraction::new(style, settings.assume_yes);
    let result = execute_intent(layout, settings, intent, &interaction);
    interaction.finish_progress();
    let result = result?;

    for line in format_result_lines(&result, style) {
        println!("{line}");
    }
    Ok(ExitCode::from(exit_code_for(result.status)))
}

pub(crate) fn execute_intent(
    layout: &PrefixLayout,
    settings: &Settings,
    intent: Intent,
    interaction: &TerminalInteraction,
) -> Result<OperationResult> {
    layout.ensure_base_dirs()?;

    let resume = FileResumeStore::new(layout.resume_path());
    if intent != Intent::Resume && resume.has_pending()? {
        warn!(intent = %intent, "refusing to start while an interrupted operation is pending");
        return Ok(OperationResult::cancel(
            "an interrupted operation is pending; run `hostpack resume` first",
        ));
    }

    let registry = settings.registry_root.as_ref().map(RegistryIndex::open);
    let catalog: Box<dyn CatalogClient> = match &registry {
        Some(registry) => Box::new(registry.clone()),
        None if needs_catalog(&intent) => Box::new(open_registry(settings)?),
        None => Box::new(MemoryCatalog::new()),
    };

    let state = FsStateStore::new(layout.clone());
    let controllers = Controllers::new(
        Arc::new(StagingController::new(
            FsPackageController::new(layout.clone(), StorageMode::HostManaged),
            registry.clone(),
        )),
        Arc::new(StagingController::new(
            FsPackageController::new(layout.clone(), StorageMode::Vendored),
            registry,
        )),
    );
    let options = OperationOptions {
        solver: SolverOptions {
            only_stable: settings.only_stable,
            method: settings.method,
        },
        confirm: true,
        host_frameworks: settings.host_frameworks.clone(),
    };

    let mut operation = Operation::new(
        intent,
        OperationServices {
            catalog: catalog.as_ref(),
            state: &state,
            controllers: &controllers,
            resume: &resume,
            interaction,
        },
        OperationLock::with_marker(layout.lock_path()),
        options,
    );
    Ok(operation.execute()?)
}

pub(crate) fn format_list_lines(receipts: &[InstallReceipt]) -> Vec<String> {
    if receipts.is_empty() {
        return vec!["no packages installed".to_string()];
    }
    receipts
        .iter()
        .map(|receipt| {
            let reason = match receipt.install_reason {
                InstallReason::Root => "root",
                InstallReason::Dependency => "dependency",
            };
            let native = if receipt.native { ", native" } else { "" };
            format!(
                "{} {} ({reason}, {}{native})",
                receipt.id, receipt.version, receipt.storage_mode
            )
        })
        .collect()
}

pub(crate) fn format_info_lines(id: &str, versions: &[CatalogEntry]) -> Vec<String> {
    let mut lines = vec![format!("Package: {id}")];
    for entry in versions {
        let mut line = format!("- {}", entry.version);
        if !entry.target_framework.is_empty() {
            line.push_str(&format!(" [{}]", entry.target_framework));
        }
        if !entry.is_stable() {
            line.push_str(" (pre-release)");
        }
        if entry.require_license_acceptance {
            line.push_str(" (license)");
        }
        lines.push(line);
        for dependency in &entry.dependencies {
            lines.push(format!("    requires {dependency}"));
        }
    }
    lines
}
