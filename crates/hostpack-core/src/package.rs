use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::version_set::{serde_version, VersionSet};

pub fn package_key(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDependency {
    pub id: String,
    #[serde(default)]
    pub range: VersionSet,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, range: VersionSet) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    pub fn key(&self) -> String {
        package_key(&self.id)
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.range)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    #[serde(with = "serde_version")]
    pub version: Version,
    #[serde(default)]
    pub target_framework: String,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

impl Package {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            target_framework: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, id: impl Into<String>, range: VersionSet) -> Self {
        self.dependencies.push(PackageDependency::new(id, range));
        self
    }

    pub fn with_target_framework(mut self, target_framework: impl Into<String>) -> Self {
        self.target_framework = target_framework.into();
        self
    }

    pub fn key(&self) -> String {
        package_key(&self.id)
    }

    pub fn is_same_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id.trim())
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.id.eq_ignore_ascii_case(&other.id)
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
        self.version.hash(state);
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
