//! Remote drive storage backend: uploads versions with HTTP `PUT`.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use super::{version_relative_path, StorageBackend, StorageError};
use crate::models::{NewVersion, ResourceIdentity};

/// Uploads each version to `{base_url}/{relative path}`; locators are URLs.
#[derive(Debug, Clone)]
pub struct RemoteDriveBackend {
    name: String,
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl RemoteDriveBackend {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            token,
            client,
        }
    }

    /// Upload URL for a version, percent-encoding every path segment.
    pub fn upload_url(&self, resource: &ResourceIdentity, version: &NewVersion) -> String {
        let relative = version_relative_path(resource, version);
        let segments: Vec<String> = relative
            .components()
            .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
            .collect();
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            segments.join("/")
        )
    }
}

#[async_trait]
impl StorageBackend for RemoteDriveBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn persist(
        &self,
        local: &Path,
        resource: &ResourceIdentity,
        version: &NewVersion,
    ) -> Result<String, StorageError> {
        let url = self.upload_url(resource, version);
        let body = tokio::fs::read(local).await?;

        let mut request = self.client.put(&url).body(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected {
                url,
                status: response.status().as_u16(),
            });
        }

        tracing::debug!("Uploaded {} to {}", resource, url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one HTTP request, answer with `status`, and return the raw
    /// request text.
    async fn serve_once(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\n\r\n", status);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    fn version() -> NewVersion {
        NewVersion {
            mimetype: "pdf".into(),
            url: "https://example.org/a.pdf".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap(),
            last_changed: Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap(),
            hashsum: "abc".into(),
            short_name: "A.pdf".into(),
        }
    }

    #[tokio::test]
    async fn test_persist_puts_bytes_with_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.pdf");
        std::fs::write(&local, b"schedule bytes").unwrap();

        let (base_url, server) = serve_once("201 Created").await;
        let backend = RemoteDriveBackend::new(
            "drive",
            format!("{}/files", base_url),
            Some("secret-token".into()),
            Client::new(),
        );
        let resource = ResourceIdentity::new("RZ/K1", "Kurs 1");

        let locator = backend.persist(&local, &resource, &version()).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(locator, backend.upload_url(&resource, &version()));
        assert!(locator.starts_with(&format!("{}/files/RZ/K1/Kurs%201/", base_url)));

        let request_line = request.lines().next().unwrap();
        let path = locator.strip_prefix(&base_url).unwrap();
        assert_eq!(request_line, format!("PUT {} HTTP/1.1", path));
        assert!(request
            .lines()
            .any(|line| line.eq_ignore_ascii_case("authorization: Bearer secret-token")));
        assert!(request.ends_with("schedule bytes"));
    }

    #[tokio::test]
    async fn test_persist_reports_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.pdf");
        std::fs::write(&local, b"schedule bytes").unwrap();

        let (base_url, server) = serve_once("403 Forbidden").await;
        let backend = RemoteDriveBackend::new("drive", base_url, None, Client::new());
        let resource = ResourceIdentity::new("RZ", "Kurs 1");

        let result = backend.persist(&local, &resource, &version()).await;
        let request = server.await.unwrap();

        assert!(matches!(
            result,
            Err(StorageError::Rejected { status: 403, .. })
        ));
        assert!(!request
            .lines()
            .any(|line| line.to_ascii_lowercase().starts_with("authorization:")));
    }

    #[test]
    fn test_upload_url_encodes_segments() {
        let backend = RemoteDriveBackend::new(
            "drive",
            "https://drive.example.org/files/",
            None,
            Client::new(),
        );
        let resource = ResourceIdentity::new("РЗ/К1", "Курс 1");
        let version = NewVersion {
            mimetype: "xlsx".into(),
            url: "https://example.org/a.xlsx".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap(),
            last_changed: Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap(),
            hashsum: "abc".into(),
            short_name: "K.xlsx".into(),
        };

        let url = backend.upload_url(&resource, &version);
        assert!(url.starts_with("https://drive.example.org/files/%D0%A0%D0%97/%D0%9A1/"));
        assert!(url.contains("/%D0%9A%D1%83%D1%80%D1%81%201/"));
        assert!(url.ends_with("20240901T083000.000000_K.xlsx"));
    }
}
