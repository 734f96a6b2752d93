mod config;
mod controller;
mod fs_utils;
mod layout;
mod manifest;
mod marker;
mod receipts;
mod resume;
mod state;
mod types;

pub use config::HostConfig;
pub use controller::{FsPackageController, PackageController};
pub use fs_utils::{copy_dir_recursive, remove_dir_if_exists, remove_file_if_exists};
pub use layout::PrefixLayout;
pub use manifest::HostManifest;
pub use marker::{
    claim_operation_marker, clear_operation_marker, current_unix_timestamp, read_operation_marker,
    OperationMarker,
};
pub use receipts::{
    read_install_receipt, read_install_receipts, remove_install_receipt, write_install_receipt,
};
pub use resume::{FileResumeStore, ResumeRecord, ResumeStore};
pub use state::{FsStateStore, PackageStateStore};
pub use types::{InstallReason, InstallReceipt, StorageMode};
