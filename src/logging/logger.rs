// file: src/logging/logger.rs
// version: 1.1.0
// guid: 7d20c4e8-93b5-4a61-8f02-64e1b5a7d839

//! Logger initialization and configuration

use crate::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| {
            crate::error::InstallError::validation(format!("Failed to initialize logger: {}", e))
        })?;

    Ok(())
}

/// Create a scoped span for a provisioning stage
pub fn stage_span(stage: &str) -> tracing::Span {
    tracing::info_span!("stage", name = stage)
}

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_default() {
        // The subscriber can only be installed once per process, so the
        // result depends on test ordering; either outcome is acceptable.
        let result = init_logger(false, false);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_stage_span_carries_name() {
        let span = stage_span("packages");
        let _enter = span.enter();
    }
}
