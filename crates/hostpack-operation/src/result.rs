use std::fmt;

use hostpack_core::Package;

pub const ROLLBACK_MESSAGE: &str =
    "operation failed; packages were rolled back to their previous state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Progress,
    Success,
    Cancel,
    Failure,
    RestartRequired,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Cancel => "cancel",
            Self::Failure => "failure",
            Self::RestartRequired => "restart-required",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub status: OperationStatus,
    pub message: String,
    pub skipped: Vec<Package>,
}

impl OperationResult {
    pub fn new(status: OperationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            skipped: Vec::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(OperationStatus::Success, message)
    }

    pub fn cancel(message: impl Into<String>) -> Self {
        Self::new(OperationStatus::Cancel, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(OperationStatus::Failure, message)
    }

    pub fn restart_required(message: impl Into<String>) -> Self {
        Self::new(OperationStatus::RestartRequired, message)
    }

    pub fn with_skipped(mut self, skipped: Vec<Package>) -> Self {
        self.skipped = skipped;
        self
    }
}
