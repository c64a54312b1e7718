// file: src/cli/commands.rs
// version: 1.1.0
// guid: 70b5e8d2-4c19-4f83-a6e0-9d27c1f4b586

//! Command implementations for the CLI

use crate::cli::args::{build_request, InstallArgs};
use crate::installer::Installer;
use crate::stages::environment;
use crate::Result;
use tracing::{info, warn};

/// Run the full installation sequence
pub async fn install_command(args: InstallArgs) -> Result<()> {
    // Request building and validation happen before any stage touches the
    // host; a rejected request exits without side effects.
    let request = build_request(&args)?;
    info!(
        "Installing panel for {} (wings: {})",
        request.domain,
        if request.deploy_wings { "yes" } else { "no" }
    );

    let installer = Installer::new(request);
    installer.run().await
}

/// Report host support and tool availability, mutating nothing
pub async fn check_command(json: bool) -> Result<()> {
    let report = environment::preflight().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| crate::error::InstallError::validation(e.to_string()))?
        );
        return Ok(());
    }

    if report.supported {
        info!(
            "Host: {} {} (supported)",
            report.host.id, report.host.version_id
        );
    } else {
        warn!(
            "Host: {} {} (unsupported; install requires Ubuntu 22.04)",
            report.host.id, report.host.version_id
        );
    }

    if report.root {
        info!("Privilege: running as root");
    } else {
        warn!("Privilege: not root; a real install will refuse to run");
    }

    for tool in &report.required_tools {
        if tool.present {
            info!("Found required tool: {}", tool.name);
        } else {
            warn!("Missing required tool: {}", tool.name);
        }
    }

    for tool in &report.provisioned_tools {
        if tool.present {
            info!("Already present: {}", tool.name);
        } else {
            info!("Not yet installed (package stage provides it): {}", tool.name);
        }
    }

    Ok(())
}
