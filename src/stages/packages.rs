// file: src/stages/packages.rs
// version: 1.2.0
// guid: 72c0d9e4-8b16-4a53-97f2-d31e68a5c049

//! Package installation stage
//!
//! Registers third-party package sources and installs everything later
//! stages shell out to. Repository registration is guarded so re-runs do
//! not duplicate sources; package installation is idempotent through the
//! package manager itself. Any failure here is fatal.

use crate::stages::{exec, StageReport};
use crate::Result;
use tracing::{debug, info};

const STAGE: &str = "packages";

/// Package set for the panel host
const PACKAGES: &[&str] = &[
    "nginx",
    "mariadb-server",
    "redis-server",
    "php8.1",
    "php8.1-cli",
    "php8.1-fpm",
    "php8.1-gd",
    "php8.1-mysql",
    "php8.1-mbstring",
    "php8.1-bcmath",
    "php8.1-xml",
    "php8.1-curl",
    "php8.1-zip",
    "certbot",
    "tar",
    "unzip",
    "git",
    "curl",
];

/// Apt source directory scanned by the duplicate guard
const APT_SOURCES_DIR: &str = "/etc/apt/sources.list.d";

/// True when a source listing already contains an entry for `needle`
pub fn has_source_entry(listing: &[String], needle: &str) -> bool {
    listing.iter().any(|entry| entry.contains(needle))
}

async fn source_dir_listing() -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(mut dir) = tokio::fs::read_dir(APT_SOURCES_DIR).await {
        while let Ok(Some(entry)) = dir.next_entry().await {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names
}

/// Register the PHP PPA and the Node.js repository, each exactly once
async fn ensure_repositories() -> Result<()> {
    let listing = source_dir_listing().await;

    if has_source_entry(&listing, "ondrej") {
        debug!("PHP repository already registered, skipping");
    } else {
        info!("Registering PHP package repository");
        exec::run_checked(
            "add-apt-repository",
            &["-y", "ppa:ondrej/php"],
            "register PHP repository",
        )
        .await?;
    }

    if has_source_entry(&listing, "nodesource") {
        debug!("Node.js repository already registered, skipping");
    } else {
        info!("Registering Node.js package repository");
        exec::run_script(
            "curl -fsSL https://deb.nodesource.com/setup_16.x | bash -",
            "register Node.js repository",
        )
        .await?;
    }

    Ok(())
}

/// Install the panel's dependency manager and asset tooling, each guarded
async fn ensure_build_tooling() -> Result<()> {
    if exec::succeeds("bash", &["-c", "command -v composer >/dev/null"]).await {
        debug!("composer already installed, skipping");
    } else {
        info!("Installing composer");
        exec::run_script(
            "curl -sS https://getcomposer.org/installer | php -- --install-dir=/usr/local/bin --filename=composer",
            "install composer",
        )
        .await?;
    }

    if exec::succeeds("bash", &["-c", "command -v yarn >/dev/null"]).await {
        debug!("yarn already installed, skipping");
    } else {
        info!("Installing yarn");
        exec::run_checked("npm", &["install", "-g", "yarn"], "install yarn").await?;
    }

    Ok(())
}

/// Ensure repositories and install the full package set
pub async fn run() -> Result<StageReport> {
    ensure_repositories().await?;

    info!("Updating package lists");
    exec::run_script(
        "DEBIAN_FRONTEND=noninteractive apt-get update",
        "apt-get update",
    )
    .await?;

    info!("Installing {} packages", PACKAGES.len() + 1);
    let install_cmd = format!(
        "DEBIAN_FRONTEND=noninteractive apt-get install -y {} nodejs",
        PACKAGES.join(" ")
    );
    exec::run_script(&install_cmd, "package installation").await?;

    ensure_build_tooling().await?;

    // Apt usually starts these on install; make it explicit so the
    // datastore stage never races a stopped engine.
    exec::run_checked(
        "systemctl",
        &["enable", "--now", "mariadb", "redis-server"],
        "enable datastore services",
    )
    .await?;

    info!("Required packages installed");
    Ok(StageReport::completed(STAGE))
}
