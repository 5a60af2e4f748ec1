//! Downloading schedule files to scratch storage.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieves the bytes behind a file URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Build the shared HTTP client.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// HTTP fetcher streaming response bodies to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;

        // Only a plain 200 counts as a download
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("Fetched {} ({} bytes)", url, written);
        Ok(written)
    }
}
