// file: src/config/request.rs
// version: 1.2.0
// guid: e91a46d7-03b8-4c52-bf69-2d75a8e0c134

//! Install request structures
//!
//! The request is built once from command-line input, validated, and then
//! passed by reference into every stage. No stage re-parses strings or
//! reads ambient process environment for request data.

use crate::error::InstallError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a certificate-issuance failure is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsPolicy {
    /// Abort the whole run if the certificate request fails
    Strict,
    /// Warn, continue without TLS, and instruct the operator to retry
    #[default]
    BestEffort,
}

/// Resource reservation policy for the node agent
///
/// The node's advertised capacity is the host total minus this reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservePolicy {
    /// Reserve a percentage of the host total (memory and disk alike)
    Percent(u8),
    /// Reserve fixed amounts, in MiB
    Fixed { memory_mib: u64, disk_mib: u64 },
}

impl Default for ReservePolicy {
    fn default() -> Self {
        ReservePolicy::Percent(20)
    }
}

impl ReservePolicy {
    /// Usable memory allocation for a host total, in MiB
    pub fn usable_memory(&self, total_mib: u64) -> u64 {
        match self {
            ReservePolicy::Percent(p) => total_mib * (100 - u64::from(*p)) / 100,
            ReservePolicy::Fixed { memory_mib, .. } => total_mib.saturating_sub(*memory_mib),
        }
    }

    /// Usable disk allocation for a host total, in MiB
    pub fn usable_disk(&self, total_mib: u64) -> u64 {
        match self {
            ReservePolicy::Percent(p) => total_mib * (100 - u64::from(*p)) / 100,
            ReservePolicy::Fixed { disk_mib, .. } => total_mib.saturating_sub(*disk_mib),
        }
    }
}

impl std::str::FromStr for ReservePolicy {
    type Err = InstallError;

    /// Accepts `percent:<n>` or `fixed:<memory-mib>,<disk-mib>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(value) = s.strip_prefix("percent:") {
            let p: u8 = value.parse().map_err(|_| {
                InstallError::validation(format!("Invalid reserve percentage: {}", value))
            })?;
            if p >= 100 {
                return Err(InstallError::validation(
                    "Reserve percentage must be below 100".to_string(),
                ));
            }
            return Ok(ReservePolicy::Percent(p));
        }

        if let Some(value) = s.strip_prefix("fixed:") {
            let (mem, disk) = value.split_once(',').ok_or_else(|| {
                InstallError::validation(format!(
                    "Fixed reserve needs <memory-mib>,<disk-mib>, got: {}",
                    value
                ))
            })?;
            let memory_mib = mem.trim().parse().map_err(|_| {
                InstallError::validation(format!("Invalid memory reserve: {}", mem))
            })?;
            let disk_mib = disk.trim().parse().map_err(|_| {
                InstallError::validation(format!("Invalid disk reserve: {}", disk))
            })?;
            return Ok(ReservePolicy::Fixed {
                memory_mib,
                disk_mib,
            });
        }

        Err(InstallError::validation(format!(
            "Unknown reserve policy '{}': expected percent:<n> or fixed:<mem>,<disk>",
            s
        )))
    }
}

impl std::fmt::Display for ReservePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservePolicy::Percent(p) => write!(f, "percent:{}", p),
            ReservePolicy::Fixed {
                memory_mib,
                disk_mib,
            } => write!(f, "fixed:{},{}", memory_mib, disk_mib),
        }
    }
}

/// Parse a string-typed boolean at the input boundary
///
/// The flag syntax carries `true`/`false` words; they are converted exactly
/// once, here, and only real `bool`s travel downstream.
pub fn parse_bool_like(value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(InstallError::validation(format!(
            "Expected a boolean (true/false), got: {}",
            other
        ))),
    }
}

/// The validated, immutable set of user-supplied install parameters
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Public domain name the panel is served under
    #[validate(length(min = 1, message = "domain must not be empty"))]
    pub domain: String,

    /// Serve the panel over HTTPS and request a certificate
    pub use_ssl: bool,

    /// Failure handling for certificate issuance
    pub tls_policy: TlsPolicy,

    /// Administrator contact and first-account identity
    #[validate(email(message = "admin email must be a valid address"))]
    pub admin_email: String,

    #[validate(length(min = 1, message = "admin username must not be empty"))]
    pub admin_username: String,

    #[validate(length(min = 1, message = "first name must not be empty"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "last name must not be empty"))]
    pub last_name: String,

    #[validate(length(min = 8, message = "admin password must be at least 8 characters"))]
    pub admin_password: String,

    /// Install and register the wings node daemon
    pub deploy_wings: bool,

    /// Distinct domain for the node API, when wings gets its own vhost/cert
    pub node_domain: Option<String>,

    /// Capacity reservation policy for the node record
    pub reserve: ReservePolicy,

    /// Timezone handed to the application configuration
    pub timezone: String,
}

impl InstallRequest {
    /// Validate all fields, including cross-field constraints
    pub fn validate_all(&self) -> crate::Result<()> {
        Validate::validate(self).map_err(|e| InstallError::validation(flatten_errors(&e)))?;

        if !is_plausible_hostname(&self.domain) {
            return Err(InstallError::validation(format!(
                "'{}' is not a valid domain name",
                self.domain
            )));
        }

        if let Some(node) = &self.node_domain {
            if !is_plausible_hostname(node) {
                return Err(InstallError::validation(format!(
                    "'{}' is not a valid node domain name",
                    node
                )));
            }
        }

        if self.node_domain.is_some() && !self.deploy_wings {
            return Err(InstallError::validation(
                "A node domain was given but wings deployment is disabled".to_string(),
            ));
        }

        // The rendered base URL is handed to the application and the
        // health check verbatim; refuse anything that does not parse.
        url::Url::parse(&self.base_url()).map_err(|e| {
            InstallError::validation(format!("'{}' does not form a valid URL: {}", self.domain, e))
        })?;

        Ok(())
    }

    /// Public base URL, scheme chosen by the SSL flag
    pub fn base_url(&self) -> String {
        if self.use_ssl {
            format!("https://{}", self.domain)
        } else {
            format!("http://{}", self.domain)
        }
    }

    /// FQDN the node record is registered under
    pub fn node_fqdn(&self) -> &str {
        self.node_domain.as_deref().unwrap_or(&self.domain)
    }
}

/// Hostname sanity check: labels of letters/digits/hyphens joined by dots
fn is_plausible_hostname(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 253
        && !value.starts_with('.')
        && !value.ends_with('.')
        && value.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn flatten_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value for {}", field));
            parts.push(message);
        }
    }
    parts.sort();
    parts.join("; ")
}
