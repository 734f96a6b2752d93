use hostpack_core::Package;
use hostpack_installer::PackageController;
use rayon::prelude::*;
use tracing::{error, info};

/// Best-effort return to `baseline`: removes what this run installed, then
/// reinstalls every baseline package that no longer probes as installed.
/// Errors are logged and the remaining steps still run.
pub(crate) fn rollback(
    install_controller: &dyn PackageController,
    restore_controller: &dyn PackageController,
    installing: &[Package],
    baseline: &[Package],
) {
    info!(
        installed = installing.len(),
        baseline = baseline.len(),
        "rolling back operation"
    );

    for package in installing.iter().rev() {
        if let Err(err) = install_controller.uninstall(package) {
            error!(package = %package, error = %format!("{err:#}"), "rollback could not remove package");
        }
    }

    let missing = baseline
        .par_iter()
        .filter(|package| !matches!(restore_controller.is_correctly_installed(package), Ok(true)))
        .collect::<Vec<_>>();

    for package in missing {
        match restore_controller.install(package) {
            Ok(_) => info!(package = %package, "restored package"),
            Err(err) => {
                error!(package = %package, error = %format!("{err:#}"), "rollback could not restore package")
            }
        }
    }
}
