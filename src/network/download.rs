// file: src/network/download.rs
// version: 1.1.0
// guid: d07b9e25-4a81-4c6f-92d3-5f60b8a1c472

//! Network download utilities

use crate::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(test)]
#[derive(Default)]
struct MockResponses {
    download_with_progress: Option<Result<String>>,
    download: Option<Result<()>>,
    verify_url: Option<Result<bool>>,
    probe_status: Option<Result<u16>>,
}

#[cfg(test)]
static MOCK_RESPONSES: OnceLock<Mutex<MockResponses>> = OnceLock::new();

#[cfg(test)]
fn mock_storage() -> &'static Mutex<MockResponses> {
    MOCK_RESPONSES.get_or_init(|| Mutex::new(MockResponses::default()))
}

#[cfg(test)]
fn take_mock_download_with_progress() -> Option<Result<String>> {
    mock_storage().lock().unwrap().download_with_progress.take()
}

#[cfg(test)]
fn take_mock_download() -> Option<Result<()>> {
    mock_storage().lock().unwrap().download.take()
}

#[cfg(test)]
fn take_mock_verify_url() -> Option<Result<bool>> {
    mock_storage().lock().unwrap().verify_url.take()
}

#[cfg(test)]
fn take_mock_probe_status() -> Option<Result<u16>> {
    mock_storage().lock().unwrap().probe_status.take()
}

#[cfg(test)]
pub(crate) fn set_mock_download_with_progress(result: Result<String>) {
    mock_storage().lock().unwrap().download_with_progress = Some(result);
}

#[cfg(test)]
pub(crate) fn set_mock_download(result: Result<()>) {
    mock_storage().lock().unwrap().download = Some(result);
}

#[cfg(test)]
pub(crate) fn set_mock_verify_url(result: Result<bool>) {
    mock_storage().lock().unwrap().verify_url = Some(result);
}

#[cfg(test)]
pub(crate) fn set_mock_probe_status(result: Result<u16>) {
    mock_storage().lock().unwrap().probe_status = Some(result);
}

/// Network downloader with progress tracking
pub struct NetworkDownloader {
    client: Option<reqwest::Client>,
}

impl NetworkDownloader {
    /// Create a new network downloader
    pub fn new() -> Self {
        #[cfg(test)]
        {
            Self { client: None }
        }

        #[cfg(not(test))]
        {
            Self {
                client: Some(reqwest::Client::new()),
            }
        }
    }

    /// Download a release artifact with a progress bar
    ///
    /// A non-success HTTP status fails before a single byte is written, so
    /// no partial file is left for later stages to trip over. Returns the
    /// SHA-256 of the downloaded content for the install record.
    pub async fn download_with_progress<P: AsRef<Path>>(
        &self,
        url: &str,
        dest: P,
    ) -> Result<String> {
        #[cfg(test)]
        if let Some(mock) = take_mock_download_with_progress() {
            return mock;
        }

        let client = self
            .client
            .as_ref()
            .expect("reqwest client available outside tests");

        info!("Downloading: {}", url);

        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(crate::error::InstallError::network(format!(
                "Download of {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);

        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-")
        );

        let mut file = File::create(&dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut hasher = Sha256::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        pb.finish_with_message("Download completed");

        let digest = hex::encode(hasher.finalize());
        info!("Downloaded to: {}", dest.as_ref().display());
        Ok(digest)
    }

    /// Download a file without progress (for smaller files)
    pub async fn download<P: AsRef<Path>>(&self, url: &str, dest: P) -> Result<()> {
        #[cfg(test)]
        if let Some(mock) = take_mock_download() {
            return mock;
        }

        let client = self
            .client
            .as_ref()
            .expect("reqwest client available outside tests");

        debug!("Downloading (no progress): {}", url);

        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(crate::error::InstallError::network(format!(
                "Download of {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(&dest, bytes).await?;

        debug!("Downloaded to: {}", dest.as_ref().display());
        Ok(())
    }

    /// Verify a URL is accessible
    pub async fn verify_url(&self, url: &str) -> Result<bool> {
        #[cfg(test)]
        if let Some(mock) = take_mock_verify_url() {
            return mock;
        }

        let client = self
            .client
            .as_ref()
            .expect("reqwest client available outside tests");

        match client.head(url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Fetch the HTTP status code for a URL (health polling)
    pub async fn probe_status(&self, url: &str) -> Result<u16> {
        #[cfg(test)]
        if let Some(mock) = take_mock_probe_status() {
            return mock;
        }

        let client = self
            .client
            .as_ref()
            .expect("reqwest client available outside tests");

        let response = client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

impl Default for NetworkDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_url() {
        super::set_mock_verify_url(Ok(true));
        let downloader = NetworkDownloader::new();
        let result = downloader.verify_url("http://unused.test").await.unwrap();
        assert!(result);
    }

    #[tokio::test]
    async fn test_probe_status() {
        super::set_mock_probe_status(Ok(502));
        let downloader = NetworkDownloader::new();
        let status = downloader
            .probe_status("http://unused.test/health")
            .await
            .unwrap();
        assert_eq!(status, 502);
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        super::set_mock_download(Err(crate::error::InstallError::network(
            "Download of http://unused.test failed with status: 404",
        )));
        let downloader = NetworkDownloader::new();
        let result = downloader.download("http://unused.test", "/tmp/unused").await;
        assert!(result.is_err());
    }
}
