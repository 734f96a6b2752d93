use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use hostpack_core::{Package, PackageDependency};
use semver::Version;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub id: String,
    pub version: Version,
    pub dependencies: Vec<PackageDependency>,
    pub target_framework: String,
    pub storage_mode: StorageMode,
    pub install_reason: InstallReason,
    pub files: Vec<String>,
    pub native: bool,
    pub installed_at_unix: u64,
}

impl InstallReceipt {
    pub fn to_package(&self) -> Package {
        Package {
            id: self.id.clone(),
            version: self.version.clone(),
            target_framework: self.target_framework.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Root,
    Dependency,
}

impl InstallReason {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Dependency => "dependency",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "root" => Ok(Self::Root),
            "dependency" => Ok(Self::Dependency),
            _ => Err(anyhow!("invalid install_reason: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    #[default]
    HostManaged,
    Vendored,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostManaged => "host-managed",
            Self::Vendored => "vendored",
        }
    }

    pub(crate) fn parse_receipt_token(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "host-managed" | "hostmanaged" | "managed" => Ok(Self::HostManaged),
            "vendored" | "asset" => Ok(Self::Vendored),
            other => Err(anyhow!(
                "invalid storage mode '{other}' (expected host-managed or vendored)"
            )),
        }
    }
}
