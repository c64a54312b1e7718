// file: src/stages/environment.rs
// version: 1.1.0
// guid: 4d81f6c0-29ae-4b57-9302-e8c64a1d07f9

//! Environment validation stage
//!
//! Confirms host identity and privilege before any stage mutates state.

use crate::error::InstallError;
use crate::stages::StageReport;
use crate::utils::system::SystemUtils;
use crate::Result;
use tracing::info;

const STAGE: &str = "environment";

/// The single supported distribution/version pair
pub const SUPPORTED_ID: &str = "ubuntu";
pub const SUPPORTED_VERSION: &str = "22.04";

/// Host metadata source
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Distribution identity read from os-release
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HostEnvironment {
    pub id: String,
    pub version_id: String,
}

/// Parse the ID and VERSION_ID fields out of os-release content
pub fn parse_os_release(content: &str) -> Result<HostEnvironment> {
    let mut id = None;
    let mut version_id = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(value.trim_matches('"').to_string());
        } else if let Some(value) = line.strip_prefix("VERSION_ID=") {
            version_id = Some(value.trim_matches('"').to_string());
        }
    }

    match (id, version_id) {
        (Some(id), Some(version_id)) => Ok(HostEnvironment { id, version_id }),
        _ => Err(InstallError::unsupported_host(
            "Could not determine distribution from os-release".to_string(),
        )),
    }
}

/// Check a host identity against the supported target
pub fn check_supported(env: &HostEnvironment) -> Result<()> {
    if env.id != SUPPORTED_ID || env.version_id != SUPPORTED_VERSION {
        return Err(InstallError::unsupported_host(format!(
            "This installer supports {} {} only, found {} {}",
            SUPPORTED_ID, SUPPORTED_VERSION, env.id, env.version_id
        )));
    }
    Ok(())
}

/// Validate the host OS and privilege level
///
/// Read-only; must run before any mutating stage.
pub async fn run() -> Result<StageReport> {
    let content = tokio::fs::read_to_string(OS_RELEASE_PATH)
        .await
        .map_err(|e| {
            InstallError::unsupported_host(format!("Cannot read {}: {}", OS_RELEASE_PATH, e))
        })?;

    let env = parse_os_release(&content)?;
    check_supported(&env)?;

    if !SystemUtils::is_root() {
        return Err(InstallError::privilege(
            "This installer must run as root".to_string(),
        ));
    }

    info!("Host check passed: {} {}", env.id, env.version_id);
    Ok(StageReport::completed(STAGE))
}

/// External tools later stages shell out to, for the preflight report
pub const REQUIRED_TOOLS: &[&str] = &[
    "curl",
    "tar",
    "systemctl",
    "crontab",
    "apt-get",
    "add-apt-repository",
];

/// Tools installed by the package stage itself; missing is informational
pub const PROVISIONED_TOOLS: &[&str] = &[
    "nginx", "mariadb", "php", "composer", "yarn", "certbot", "docker",
];

/// Presence of one external tool
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub present: bool,
}

/// Preflight findings for the `check` subcommand
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub host: HostEnvironment,
    pub supported: bool,
    pub root: bool,
    pub required_tools: Vec<ToolStatus>,
    pub provisioned_tools: Vec<ToolStatus>,
}

/// Gather the preflight report; mutates nothing
pub async fn preflight() -> Result<CheckReport> {
    let content = tokio::fs::read_to_string(OS_RELEASE_PATH).await?;
    let host = parse_os_release(&content)?;
    let supported = check_supported(&host).is_ok();

    let probe = |tools: &[&'static str]| -> Vec<ToolStatus> {
        tools
            .iter()
            .map(|&name| ToolStatus {
                name,
                present: SystemUtils::command_exists(name),
            })
            .collect()
    };

    Ok(CheckReport {
        host,
        supported,
        root: SystemUtils::is_root(),
        required_tools: probe(REQUIRED_TOOLS),
        provisioned_tools: probe(PROVISIONED_TOOLS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os_release_jammy() {
        let content = "PRETTY_NAME=\"Ubuntu 22.04.3 LTS\"\nNAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\n";
        let env = parse_os_release(content).unwrap();
        assert_eq!(env.id, "ubuntu");
        assert_eq!(env.version_id, "22.04");
        assert!(check_supported(&env).is_ok());
    }

    #[test]
    fn test_other_ubuntu_version_rejected() {
        let env = HostEnvironment {
            id: "ubuntu".to_string(),
            version_id: "20.04".to_string(),
        };
        let err = check_supported(&env).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_other_distribution_rejected() {
        let env = HostEnvironment {
            id: "debian".to_string(),
            version_id: "12".to_string(),
        };
        let err = check_supported(&env).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("debian"));
    }

    #[test]
    fn test_parse_os_release_missing_fields() {
        assert!(parse_os_release("NAME=Something\n").is_err());
    }
}
