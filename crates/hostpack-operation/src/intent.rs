use std::fmt;

use hostpack_installer::StorageMode;
use semver::Version;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Install { id: String, version: Option<Version> },
    ChangeVersion { id: String, version: Version },
    Uninstall { id: String },
    Repair { id: Option<String> },
    ReinstallAll,
    Cleanup,
    ConvertStorageMode { target: StorageMode },
    Resume,
}

impl Intent {
    /// Intents that are safe by construction or were approved before a restart.
    pub fn suppresses_confirmation(&self) -> bool {
        matches!(
            self,
            Self::Cleanup | Self::ConvertStorageMode { .. } | Self::Resume
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::ChangeVersion { .. } => "change-version",
            Self::Uninstall { .. } => "uninstall",
            Self::Repair { .. } => "repair",
            Self::ReinstallAll => "reinstall-all",
            Self::Cleanup => "cleanup",
            Self::ConvertStorageMode { .. } => "convert",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install { id, version: None } => write!(f, "install {id}"),
            Self::Install {
                id,
                version: Some(version),
            } => write!(f, "install {id}@{version}"),
            Self::ChangeVersion { id, version } => write!(f, "change {id} to {version}"),
            Self::Uninstall { id } => write!(f, "uninstall {id}"),
            Self::Repair { id: Some(id) } => write!(f, "repair {id}"),
            Self::Repair { id: None } => f.write_str("repair all packages"),
            Self::ReinstallAll => f.write_str("reinstall all packages"),
            Self::Cleanup => f.write_str("remove all packages"),
            Self::ConvertStorageMode { target } => write!(f, "convert packages to {target}"),
            Self::Resume => f.write_str("resume interrupted operation"),
        }
    }
}
