use hostpack_core::Package;

use crate::Preview;

pub trait OperationInteraction: Send + Sync {
    fn confirm_changes(&self, preview: &Preview) -> bool;

    fn accept_license(&self, package: &Package, license_url: Option<&str>) -> bool;

    fn report_progress(&self, _step: &str, _done: usize, _total: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl OperationInteraction for AutoApprove {
    fn confirm_changes(&self, _preview: &Preview) -> bool {
        true
    }

    fn accept_license(&self, _package: &Package, _license_url: Option<&str>) -> bool {
        true
    }
}
