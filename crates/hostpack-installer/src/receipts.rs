use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hostpack_core::{parse_version, PackageDependency, VersionSet};

use crate::fs_utils::remove_file_if_exists;
use crate::{InstallReason, InstallReceipt, PrefixLayout, StorageMode};

const RECEIPT_EXTENSION: &str = "receipt";

fn render_receipt(receipt: &InstallReceipt) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "id={}", receipt.id);
    let _ = writeln!(out, "version={}", receipt.version);
    for dependency in &receipt.dependencies {
        let _ = writeln!(out, "dependency={dependency}");
    }
    if !receipt.target_framework.is_empty() {
        let _ = writeln!(out, "target_framework={}", receipt.target_framework);
    }
    let _ = writeln!(out, "storage_mode={}", receipt.storage_mode.as_str());
    let _ = writeln!(out, "install_reason={}", receipt.install_reason.as_str());
    for file in &receipt.files {
        let _ = writeln!(out, "file={file}");
    }
    let _ = writeln!(out, "native={}", receipt.native);
    let _ = writeln!(out, "installed_at_unix={}", receipt.installed_at_unix);
    out
}

pub fn write_install_receipt(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    let path = layout.receipt_path(&receipt.id);
    let dir = layout.installed_state_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create receipt directory {}", dir.display()))?;
    fs::write(&path, render_receipt(receipt))
        .with_context(|| format!("failed to write receipt for {}", receipt.id))?;
    Ok(path)
}

fn load_receipt(path: &Path) -> Result<InstallReceipt> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read receipt {}", path.display()))?;
    parse_receipt(&raw).with_context(|| format!("malformed receipt {}", path.display()))
}

pub fn read_install_receipt(layout: &PrefixLayout, id: &str) -> Result<Option<InstallReceipt>> {
    let path = layout.receipt_path(id);
    if !path.is_file() {
        return Ok(None);
    }
    load_receipt(&path).map(Some)
}

pub fn read_install_receipts(layout: &PrefixLayout) -> Result<Vec<InstallReceipt>> {
    let dir = layout.installed_state_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let listing = fs::read_dir(&dir)
        .with_context(|| format!("failed to list receipts in {}", dir.display()))?;
    let mut receipts = Vec::new();
    for entry in listing {
        let path = entry?.path();
        let is_receipt = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(RECEIPT_EXTENSION);
        if is_receipt {
            receipts.push(load_receipt(&path)?);
        }
    }

    receipts.sort_by_key(|receipt| receipt.id.to_ascii_lowercase());
    Ok(receipts)
}

pub fn remove_install_receipt(layout: &PrefixLayout, id: &str) -> Result<()> {
    let path = layout.receipt_path(id);
    remove_file_if_exists(&path)
        .with_context(|| format!("failed to remove receipt for {id}"))
}

pub(crate) fn parse_receipt(raw: &str) -> Result<InstallReceipt> {
    let mut id = None;
    let mut version = None;
    let mut dependencies = Vec::new();
    let mut target_framework = None;
    let mut storage_mode = None;
    let mut install_reason = None;
    let mut files = Vec::new();
    let mut native = false;
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim) {
        let Some((key, v)) = line.split_once('=') else {
            continue;
        };
        match key {
            "id" => id = Some(v.to_string()),
            "version" => version = Some(parse_version(v)?),
            "dependency" => dependencies.push(parse_dependency(v)?),
            "target_framework" => target_framework = Some(v.to_string()),
            "storage_mode" => storage_mode = Some(StorageMode::parse_receipt_token(v)),
            "install_reason" => install_reason = Some(InstallReason::parse(v)?),
            "file" => files.push(v.to_string()),
            "native" => native = v.parse().context("native must be true or false")?,
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(InstallReceipt {
        id: id.context("missing id")?,
        version: version.context("missing version")?,
        dependencies,
        target_framework: target_framework.unwrap_or_default(),
        storage_mode: storage_mode.unwrap_or_default(),
        install_reason: install_reason.unwrap_or(InstallReason::Root),
        files,
        native,
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}

fn parse_dependency(entry: &str) -> Result<PackageDependency> {
    let (id, range) = entry.split_once('@').unwrap_or((entry, "*"));
    let range = VersionSet::parse(range)
        .with_context(|| format!("invalid dependency range in '{entry}'"))?;
    Ok(PackageDependency::new(id.trim(), range))
}
