use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hostpack_core::Package;
use serde::{Deserialize, Serialize};

use crate::fs_utils::remove_file_if_exists;
use crate::StorageMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub install: Vec<Package>,
    pub root: Vec<String>,
    pub rollback: Vec<Package>,
    #[serde(default)]
    pub storage_mode: StorageMode,
}

pub trait ResumeStore: Send + Sync {
    fn save(&self, record: &ResumeRecord) -> Result<()>;

    fn take(&self) -> Result<Option<ResumeRecord>>;

    fn has_pending(&self) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct FileResumeStore {
    path: PathBuf,
}

impl FileResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResumeStore for FileResumeStore {
    fn save(&self, record: &ResumeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(record).with_context(|| {
            format!("failed serializing resume record: {}", self.path.display())
        })?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed writing resume record: {}", self.path.display()))
    }

    fn take(&self) -> Result<Option<ResumeRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading resume record: {}", self.path.display()))?;
        let record = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing resume record: {}", self.path.display()))?;
        remove_file_if_exists(&self.path)
            .with_context(|| format!("failed clearing resume record: {}", self.path.display()))?;
        Ok(Some(record))
    }

    fn has_pending(&self) -> Result<bool> {
        Ok(self.path.is_file())
    }
}
