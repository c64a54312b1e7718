// file: src/stages/app_config.rs
// version: 1.2.0
// guid: da84c1f0-27b5-4963-8c0e-f5a9d3062b71

//! Application configuration stage
//!
//! Drives the panel's own CLI: environment and cache wiring, datastore
//! connection, schema migration with seed data, and the first
//! administrative account. Each invocation is discrete and fatal on
//! non-zero exit; the service start and proxy stages assume a fully
//! migrated, keyed application. Ownership is reset afterwards because the
//! CLI runs as the privileged installer account.

use crate::config::paths;
use crate::config::request::InstallRequest;
use crate::stages::{exec, secrets::Secrets, StageReport};
use crate::Result;
use std::path::Path;
use tracing::{debug, info};

const STAGE: &str = "app-config";

/// One discrete invocation of the panel CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtisanCall {
    pub context: &'static str,
    pub args: Vec<String>,
}

impl ArtisanCall {
    fn new(context: &'static str, args: &[&str]) -> Self {
        Self {
            context,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The ordered CLI invocation sequence for a request
pub fn artisan_invocations(request: &InstallRequest, secrets: &Secrets) -> Vec<ArtisanCall> {
    let base_url = request.base_url();
    let db_port = paths::DB_PORT.to_string();

    vec![
        ArtisanCall::new(
            "environment setup",
            &[
                "artisan",
                "p:environment:setup",
                "--author",
                &request.admin_email,
                "--url",
                &base_url,
                "--timezone",
                &request.timezone,
                "--cache",
                "redis",
                "--session",
                "redis",
                "--queue",
                "redis",
                "--redis-host",
                "127.0.0.1",
                "--redis-pass",
                "",
                "--redis-port",
                "6379",
                "--no-interaction",
            ],
        ),
        ArtisanCall::new(
            "database configuration",
            &[
                "artisan",
                "p:environment:database",
                "--host",
                paths::DB_HOST,
                "--port",
                &db_port,
                "--database",
                paths::DB_NAME,
                "--username",
                paths::DB_USER,
                "--password",
                &secrets.db_password,
                "--no-interaction",
            ],
        ),
        ArtisanCall::new(
            "schema migration",
            &["artisan", "migrate", "--seed", "--force"],
        ),
        ArtisanCall::new(
            "administrator account",
            &[
                "artisan",
                "p:user:make",
                "--email",
                &request.admin_email,
                "--username",
                &request.admin_username,
                "--name-first",
                &request.first_name,
                "--name-last",
                &request.last_name,
                "--password",
                &request.admin_password,
                "--admin",
                "1",
                "--no-interaction",
            ],
        ),
    ]
}

/// Seed the panel's environment file from its shipped example, once
pub async fn ensure_env_file(root: &Path) -> Result<()> {
    let env = root.join(".env");
    if env.exists() {
        debug!("Environment file already present, keeping it");
        return Ok(());
    }
    tokio::fs::copy(root.join(".env.example"), &env).await?;
    Ok(())
}

/// True when the environment file still needs an application key
///
/// The key encrypts data at rest; regenerating it on a re-run would orphan
/// everything already encrypted, so generation only happens while absent.
pub async fn needs_app_key(root: &Path) -> Result<bool> {
    let content = tokio::fs::read_to_string(root.join(".env")).await?;
    Ok(!content
        .lines()
        .any(|line| line.starts_with("APP_KEY=") && line.trim_end().len() > "APP_KEY=".len()))
}

/// Configure the application through its CLI
pub async fn run(request: &InstallRequest, secrets: &Secrets) -> Result<StageReport> {
    let root = Path::new(paths::PANEL_ROOT);

    ensure_env_file(root).await?;

    if needs_app_key(root).await? {
        info!("Generating application key");
        exec::run_checked_in(
            paths::PANEL_ROOT,
            "php",
            &[
                "artisan".to_string(),
                "key:generate".to_string(),
                "--force".to_string(),
            ],
            "application key generation",
        )
        .await?;
    } else {
        debug!("Application key already set, not regenerating");
    }

    for call in artisan_invocations(request, secrets) {
        info!("Running panel CLI: {}", call.context);
        exec::run_checked_in(paths::PANEL_ROOT, "php", &call.args, call.context).await?;
    }

    // CLI invocations above ran as root; hand the tree back to the
    // service account before anything tries to serve from it.
    let chown_script = format!(
        "chown -R {user}:{user} {root}",
        user = paths::SERVICE_USER,
        root = paths::PANEL_ROOT
    );
    exec::run_script(&chown_script, "reset application ownership").await?;

    info!("Application configured and migrated");
    Ok(StageReport::completed(STAGE))
}
