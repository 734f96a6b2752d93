use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use hostpack_installer::{claim_operation_marker, clear_operation_marker, read_operation_marker};
use tracing::{debug, warn};

use crate::{OperationError, OperationStatus};

#[derive(Debug, Default)]
struct LockState {
    holder: Option<String>,
    last_status: Option<OperationStatus>,
}

/// Shared token allowing one orchestration at a time.
///
/// Clones share state. With a marker path the exclusion also covers other
/// processes working on the same project.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    state: Arc<Mutex<LockState>>,
    marker: Option<PathBuf>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::default(),
            marker: Some(path.into()),
        }
    }

    pub fn try_acquire(&self, holder: &str) -> Result<OperationGuard, OperationError> {
        let mut state = self.state();
        if let Some(current) = &state.holder {
            return Err(OperationError::LockUnavailable {
                holder: Some(current.clone()),
            });
        }

        if let Some(marker) = &self.marker {
            if let Err(err) = claim_operation_marker(marker, holder) {
                debug!(error = %format!("{err:#}"), "operation marker is held");
                return Err(OperationError::LockUnavailable {
                    holder: read_operation_marker(marker)
                        .ok()
                        .flatten()
                        .map(|held| held.to_string()),
                });
            }
        }

        state.holder = Some(holder.to_string());
        debug!(holder, "acquired operation lock");
        Ok(OperationGuard {
            lock: self.clone(),
            status: OperationStatus::Progress,
        })
    }

    pub fn is_held(&self) -> bool {
        self.state().holder.is_some()
    }

    pub fn last_status(&self) -> Option<OperationStatus> {
        self.state().last_status
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Live ownership of an [`OperationLock`]; dropping it releases the lock.
#[derive(Debug)]
pub struct OperationGuard {
    lock: OperationLock,
    status: OperationStatus,
}

impl OperationGuard {
    pub fn set_status(&mut self, status: OperationStatus) {
        self.status = status;
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if let Some(marker) = &self.lock.marker {
            if let Err(err) = clear_operation_marker(marker) {
                warn!(error = %format!("{err:#}"), "failed to clear operation marker");
            }
        }
        let mut state = self.lock.state();
        state.holder = None;
        state.last_status = Some(self.status);
        debug!(status = %self.status, "released operation lock");
    }
}
