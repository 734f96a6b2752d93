use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMarker {
    pub holder: String,
    pub pid: u32,
    pub started_at_unix: u64,
}

impl OperationMarker {
    fn for_current_process(holder: &str) -> Result<Self> {
        Ok(Self {
            holder: holder.to_string(),
            pid: std::process::id(),
            started_at_unix: current_unix_timestamp()?,
        })
    }

    /// `Some(false)` only when the owning process is known to be gone.
    pub fn owner_alive(&self) -> Option<bool> {
        if self.pid == 0 {
            return None;
        }
        if self.pid == std::process::id() {
            return Some(true);
        }
        process_alive(self.pid)
    }

    fn render(&self) -> String {
        format!(
            "holder={}\npid={}\nstarted_at_unix={}\n",
            self.holder, self.pid, self.started_at_unix
        )
    }

    fn parse(raw: &str) -> Option<Self> {
        let mut holder = None;
        let mut pid = 0;
        let mut started_at_unix = 0;
        for line in raw.lines().map(str::trim) {
            match line.split_once('=') {
                Some(("holder", value)) => holder = Some(value.to_string()),
                Some(("pid", value)) => pid = value.parse().unwrap_or(0),
                Some(("started_at_unix", value)) => started_at_unix = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        holder
            .filter(|holder| !holder.is_empty())
            .map(|holder| Self {
                holder,
                pid,
                started_at_unix,
            })
    }
}

impl std::fmt::Display for OperationMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pid == 0 {
            return write!(f, "{}", self.holder);
        }
        write!(f, "{} (pid {})", self.holder, self.pid)
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    Some(Path::new("/proc").join(pid.to_string()).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}

/// Claims the cross-process operation marker at `path`, failing when another
/// live process already holds it. A marker left by a dead process is replaced.
pub fn claim_operation_marker(path: &Path, holder: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let marker = OperationMarker::for_current_process(holder)?;

    match create_marker(path, &marker) {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let existing = read_operation_marker(path).ok().flatten();
            match existing {
                Some(stale) if stale.owner_alive() == Some(false) => {
                    warn!(holder = %stale, "replacing operation marker left by a dead process");
                    clear_operation_marker(path)?;
                    create_marker(path, &marker).with_context(|| {
                        format!("failed to claim operation marker: {}", path.display())
                    })?;
                }
                Some(existing) => {
                    return Err(anyhow!("operation marker already exists (held by {existing})"))
                }
                None => return Err(anyhow!("operation marker already exists")),
            }
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to claim operation marker: {}", path.display()));
        }
        Ok(()) => {}
    }

    Ok(path.to_path_buf())
}

fn create_marker(path: &Path, marker: &OperationMarker) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(marker.render().as_bytes())?;
    file.flush()
}

pub fn read_operation_marker(path: &Path) -> Result<Option<OperationMarker>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read operation marker: {}", path.display()));
        }
    };
    Ok(OperationMarker::parse(&raw))
}

pub fn clear_operation_marker(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err)
            .with_context(|| format!("failed to clear operation marker: {}", path.display())),
        _ => Ok(()),
    }
}

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}
