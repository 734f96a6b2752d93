mod diff;
mod error;
mod intent;
mod interaction;
mod lock;
mod orchestrator;
mod plan;
mod result;
mod rollback;

pub use diff::{render_preview_lines, Preview};
pub use error::OperationError;
pub use intent::Intent;
pub use interaction::{AutoApprove, OperationInteraction};
pub use lock::{OperationGuard, OperationLock};
pub use orchestrator::{Controllers, Operation, OperationOptions, OperationServices};
pub use plan::{plan_operation, OperationPlan, PlanOutcome};
pub use result::{OperationResult, OperationStatus, ROLLBACK_MESSAGE};

#[cfg(test)]
mod tests;
