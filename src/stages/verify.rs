// file: src/stages/verify.rs
// version: 1.1.0
// guid: 1c07e9b5-82d4-4f60-a3c9-57b1d8e24f06

//! Verification stage
//!
//! Polls the panel's public URL until it answers HTTP 200 or the retry
//! budget runs out. Fixed retry count, fixed delay, no backoff. Never
//! fatal: exhaustion tells the operator to check by hand.

use crate::network::NetworkDownloader;
use crate::stages::StageReport;
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const STAGE: &str = "verify";

/// Poll budget: 15 attempts, 2 seconds apart
pub const POLL_ATTEMPTS: u32 = 15;
pub const POLL_DELAY: Duration = Duration::from_secs(2);

/// Poll a probe until it reports HTTP 200
///
/// Returns the 1-based attempt that succeeded, or None when the budget is
/// exhausted. Polling stops at the first success.
pub async fn poll_until_ok<F, Fut>(attempts: u32, delay: Duration, mut probe: F) -> Option<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u16>>,
{
    for attempt in 1..=attempts {
        match probe().await {
            Ok(200) => return Some(attempt),
            Ok(status) => debug!("Health probe attempt {}: HTTP {}", attempt, status),
            Err(e) => debug!("Health probe attempt {}: {}", attempt, e),
        }

        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    None
}

/// Poll the public URL for a healthy response
pub async fn run(base_url: &str, downloader: &NetworkDownloader) -> Result<StageReport> {
    info!("Waiting for {} to respond", base_url);

    let outcome = poll_until_ok(POLL_ATTEMPTS, POLL_DELAY, || {
        downloader.probe_status(base_url)
    })
    .await;

    match outcome {
        Some(attempt) => {
            info!("Panel responded with HTTP 200 (attempt {})", attempt);
            Ok(StageReport::completed(STAGE))
        }
        None => {
            let text = format!(
                "{} did not return HTTP 200 within {} attempts; check the panel manually",
                base_url, POLL_ATTEMPTS
            );
            warn!("{}", text);
            Ok(StageReport::warning(STAGE, text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_on_third_attempt_and_stops() {
        let calls = AtomicU32::new(0);

        let result = poll_until_ok(15, Duration::from_secs(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n >= 3 {
                    Ok(200)
                } else {
                    Ok(503)
                }
            }
        })
        .await;

        // Success on the third poll; no further polling afterwards
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhausts_budget() {
        let calls = AtomicU32::new(0);

        let result = poll_until_ok(4, Duration::from_secs(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(500) }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_tolerates_probe_errors() {
        let calls = AtomicU32::new(0);

        let result = poll_until_ok(5, Duration::from_secs(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 2 {
                    Ok(200)
                } else {
                    Err(crate::error::InstallError::network("connection refused"))
                }
            }
        })
        .await;

        assert_eq!(result, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_needs_one_attempt() {
        let result = poll_until_ok(15, Duration::from_secs(2), || async { Ok(200) }).await;
        assert_eq!(result, Some(1));
    }
}
