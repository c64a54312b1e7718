// file: src/error.rs
// version: 1.2.0
// guid: 3f8b21c6-9a4d-4e17-b05a-72c4d1e98f30

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, InstallError>;

/// Error types for the install agent
///
/// Variants fall into three failure classes, each with a distinct process
/// exit code: host/privilege problems (1), input validation problems (2),
/// and fatal stage failures (99). Warnings (certificate issuance, final
/// health check) never surface as errors at all.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Unsupported host: {0}")]
    UnsupportedHost(String),

    #[error("Insufficient privilege: {0}")]
    Privilege(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Stage '{stage}' failed: {reason}")]
    Stage { stage: &'static str, reason: String },

    #[error("Command '{context}' failed with exit code {code}: {stderr}")]
    Execution {
        context: String,
        code: i32,
        stderr: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl InstallError {
    /// Create a new unsupported-host error
    pub fn unsupported_host(msg: impl Into<String>) -> Self {
        Self::UnsupportedHost(msg.into())
    }

    /// Create a new privilege error
    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::Privilege(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a new stage failure
    pub fn stage(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            reason: reason.into(),
        }
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Process exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedHost(_) | Self::Privilege(_) => 1,
            Self::Validation(_) | Self::Usage(_) => 2,
            _ => 99,
        }
    }
}
