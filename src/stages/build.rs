// file: src/stages/build.rs
// version: 1.1.0
// guid: c30d7f81-94ab-4e26-b5d0-68f1a2c9e457

//! Dependency and asset build stage
//!
//! Runs the panel's own dependency manager and asset builder as the
//! service account; running them as root corrupts the ownership of
//! generated files, which is the most common install failure in practice.
//! A reported-successful build without the expected manifest artifact is
//! still treated as a failure.

use crate::config::paths;
use crate::error::InstallError;
use crate::stages::{exec, StageReport};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const STAGE: &str = "build";

/// Artifact the asset build must leave behind
pub const BUILD_MANIFEST: &str = "public/assets/manifest.json";

/// Location of the build manifest under an application root
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(BUILD_MANIFEST)
}

/// Post-condition: the manifest must exist after a successful build
pub fn check_manifest(root: &Path) -> Result<()> {
    let manifest = manifest_path(root);
    if manifest.exists() {
        Ok(())
    } else {
        Err(InstallError::stage(
            STAGE,
            format!(
                "asset build reported success but {} is missing",
                manifest.display()
            ),
        ))
    }
}

/// Dump ownership/permission state of the application tree
///
/// Emitted before aborting so the operator can spot the usual culprit: a
/// tree partially owned by root instead of the service account.
async fn report_ownership_diagnostics() {
    error!("Build failed; filesystem state of {}:", paths::PANEL_ROOT);
    for script in [
        format!("ls -ld {}", paths::PANEL_ROOT),
        format!("ls -la {}/storage {}/bootstrap/cache", paths::PANEL_ROOT, paths::PANEL_ROOT),
    ] {
        let output = exec::run_unchecked("bash", &["-c", &script]).await;
        for line in output.lines() {
            error!("  {}", line);
        }
    }
}

/// Install dependencies and build assets as the service account
pub async fn run() -> Result<StageReport> {
    info!("Installing panel dependencies as {}", paths::SERVICE_USER);
    let composer_script = format!(
        "cd {} && composer install --no-dev --optimize-autoloader --no-interaction",
        paths::PANEL_ROOT
    );
    if let Err(e) = exec::run_as_user(paths::SERVICE_USER, &composer_script, "composer install").await
    {
        report_ownership_diagnostics().await;
        return Err(e);
    }

    info!("Building panel assets");
    let install_script = format!("cd {} && yarn install --frozen-lockfile", paths::PANEL_ROOT);
    if let Err(e) = exec::run_as_user(paths::SERVICE_USER, &install_script, "yarn install").await {
        report_ownership_diagnostics().await;
        return Err(e);
    }

    // Production build first; the development build is a fallback only.
    let production = format!("cd {} && yarn build:production", paths::PANEL_ROOT);
    let development = format!("cd {} && yarn build", paths::PANEL_ROOT);
    match exec::run_as_user(paths::SERVICE_USER, &production, "asset build (production)").await {
        Ok(_) => {}
        Err(prod_err) => {
            warn!(
                "Production asset build failed ({}), retrying with development build",
                prod_err
            );
            if let Err(e) =
                exec::run_as_user(paths::SERVICE_USER, &development, "asset build (development)")
                    .await
            {
                report_ownership_diagnostics().await;
                return Err(e);
            }
        }
    }

    if let Err(e) = check_manifest(Path::new(paths::PANEL_ROOT)) {
        report_ownership_diagnostics().await;
        return Err(e);
    }

    info!("Dependencies installed and assets built");
    Ok(StageReport::completed(STAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_path_layout() {
        let path = manifest_path(Path::new("/var/www/pterodactyl"));
        assert_eq!(
            path,
            Path::new("/var/www/pterodactyl/public/assets/manifest.json")
        );
    }

    #[tokio::test]
    async fn test_check_manifest_missing_is_failure() {
        // A zero exit from the builder is not enough; the artifact must exist
        let dir = tempfile::tempdir().unwrap();
        let err = check_manifest(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 99);
        assert!(err.to_string().contains("manifest.json"));
    }

    #[tokio::test]
    async fn test_check_manifest_present_passes() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("public/assets");
        tokio::fs::create_dir_all(&assets).await.unwrap();
        tokio::fs::write(assets.join("manifest.json"), "{}")
            .await
            .unwrap();

        assert!(check_manifest(dir.path()).is_ok());
    }
}
