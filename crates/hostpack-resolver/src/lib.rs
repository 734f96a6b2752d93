mod constraints;
mod error;
mod order;
mod removal;
mod search;
mod solver;
mod types;

pub use error::ResolveError;
pub use order::install_order;
pub use removal::removable_packages;
pub use solver::{DependencySolver, SolverOptions};
pub use types::{Removal, ResolvedGraph};
