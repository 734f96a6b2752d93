mod catalog;
mod controlled;
mod framework;
mod package;
mod version_set;

pub use catalog::{Catalog, CatalogClient, CatalogEntry};
pub use controlled::ControlledPackages;
pub use framework::is_framework_compatible;
pub use package::{package_key, Package, PackageDependency};
pub use version_set::{
    parse_version, preference_order, serde_version, VersionSelectMethod, VersionSet,
};
