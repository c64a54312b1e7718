// file: src/stages/artifacts.rs
// version: 1.2.0
// guid: 57a9e0b3-6fd2-4c18-9e74-a02b5c81d6f3

//! Artifact fetch stage
//!
//! Downloads the panel release archive and unpacks it into the application
//! root. A failed download halts the run before extraction, so later
//! stages never see a partially extracted tree. Some releases nest their
//! content one directory deeper than the archive root; that shape is
//! detected and flattened.

use crate::config::paths;
use crate::network::NetworkDownloader;
use crate::stages::{exec, StageReport};
use crate::Result;
use std::path::Path;
use tracing::{debug, info};

const STAGE: &str = "artifacts";

/// Flatten a single nested top-level directory into `root`
///
/// Returns true when flattening happened. Anything other than "exactly one
/// entry, and it is a directory" is left untouched.
pub async fn flatten_single_subdir(root: &Path) -> Result<bool> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(root).await?;
    while let Some(entry) = dir.next_entry().await? {
        entries.push(entry);
    }

    if entries.len() != 1 {
        return Ok(false);
    }

    let nested = &entries[0];
    if !nested.file_type().await?.is_dir() {
        return Ok(false);
    }

    let nested_path = nested.path();
    debug!("Flattening nested archive directory: {}", nested_path.display());

    let mut inner = tokio::fs::read_dir(&nested_path).await?;
    while let Some(entry) = inner.next_entry().await? {
        let target = root.join(entry.file_name());
        tokio::fs::rename(entry.path(), target).await?;
    }
    tokio::fs::remove_dir(&nested_path).await?;

    Ok(true)
}

/// Download and unpack the panel release archive
pub async fn run(downloader: &NetworkDownloader) -> Result<StageReport> {
    let staging = tempfile::Builder::new()
        .prefix("panel-release")
        .tempdir()?;
    let archive = staging.path().join("panel.tar.gz");
    let archive_str = archive.to_string_lossy().to_string();

    // Download into staging before the install root is touched; a failed
    // fetch leaves no partially extracted tree behind.
    let digest = downloader
        .download_with_progress(paths::PANEL_ARCHIVE_URL, &archive)
        .await?;
    info!("Panel archive sha256: {}", digest);

    tokio::fs::create_dir_all(paths::PANEL_ROOT).await?;

    exec::run_checked(
        "tar",
        &["-xzf", &archive_str, "-C", paths::PANEL_ROOT],
        "extract panel archive",
    )
    .await?;

    if flatten_single_subdir(Path::new(paths::PANEL_ROOT)).await? {
        info!("Archive content was nested one level deep; flattened");
    }

    // The panel expects writable storage and cache trees before any of its
    // own tooling runs.
    let chmod_script = format!(
        "cd {} && chmod -R 755 storage/* bootstrap/cache/",
        paths::PANEL_ROOT
    );
    exec::run_script(&chmod_script, "prepare storage directories").await?;

    let chown_script = format!(
        "chown -R {user}:{user} {root}",
        user = paths::SERVICE_USER,
        root = paths::PANEL_ROOT
    );
    exec::run_script(&chown_script, "normalize application ownership").await?;

    info!("Panel application unpacked at {}", paths::PANEL_ROOT);
    Ok(StageReport::completed(STAGE))
}
