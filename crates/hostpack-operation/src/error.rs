use hostpack_resolver::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("operation has already been executed")]
    AlreadyOperated,

    #[error("another operation is in progress{}", holder_suffix(.holder))]
    LockUnavailable { holder: Option<String> },

    #[error("no interrupted operation to resume")]
    NothingToResume,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to read package state: {0:#}")]
    State(anyhow::Error),
}

fn holder_suffix(holder: &Option<String>) -> String {
    holder
        .as_deref()
        .map(|holder| format!(" ({holder})"))
        .unwrap_or_default()
}
