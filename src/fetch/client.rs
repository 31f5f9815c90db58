//! Downloading provider files over HTTP.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::FetchError;

const DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc";

/// Cookie the provider sets when it wants a large-file confirmation
const CONFIRM_COOKIE_PREFIX: &str = "download_warning";

/// Fetches the bytes behind an identifier into a directory
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `identifier` into `dir` and return the final file path.
    /// On failure no file is left behind under the returned name.
    async fn download(&self, identifier: &str, dir: &Path) -> Result<PathBuf, FetchError>;
}

/// Downloads from the provider's direct-download endpoint
pub struct HttpDownloader {
    client: Client,
    endpoint: String,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_endpoint(DOWNLOAD_ENDPOINT)
    }

    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Use a preconfigured client (proxy, timeouts) against `endpoint`
    pub fn with_client<S: Into<String>>(client: Client, endpoint: S) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn download_url(&self, identifier: &str) -> String {
        format!("{}?export=download&id={}", self.endpoint, identifier)
    }

    async fn request(&self, url: &str, cookie: Option<&str>) -> Result<Response, FetchError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        request.send().await.map_err(|e| FetchError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn stream_to_file(
        mut response: Response,
        url: &str,
        part_path: &Path,
    ) -> Result<u64, FetchError> {
        let failed = |reason: String| FetchError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let mut file = tokio::fs::File::create(part_path)
            .await
            .map_err(|e| failed(format!("cannot create {}: {}", part_path.display(), e)))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| failed(e.to_string()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| failed(e.to_string()))?;

        Ok(written)
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, identifier: &str, dir: &Path) -> Result<PathBuf, FetchError> {
        let mut url = self.download_url(identifier);
        let mut response = self.request(&url, None).await?;

        // Large files answer with a warning page plus a cookie; retry once
        if let Some((name, token)) = confirmation_token(response.headers()) {
            debug!("Large-file confirmation required for {}", identifier);
            url = format!("{}&confirm={}", url, token);
            let cookie = format!("{}={}", name, token);
            response = self.request(&url, Some(&cookie)).await?;
        }

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::DownloadFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let extension = extension_for_content_type(&content_type);

        let path = dir.join(format!("{}{}", identifier, extension));
        let part_path = dir.join(format!("{}{}.part", identifier, extension));

        match Self::stream_to_file(response, &url, &part_path).await {
            Ok(bytes) => {
                tokio::fs::rename(&part_path, &path)
                    .await
                    .map_err(|e| FetchError::DownloadFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                info!("Downloaded {} ({} bytes) to {}", identifier, bytes, path.display());
                Ok(path)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }
}

/// Find the provider's large-file confirmation cookie, as (name, value)
pub fn confirmation_token(headers: &HeaderMap) -> Option<(String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim().starts_with(CONFIRM_COOKIE_PREFIX))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
}

/// Best-effort file extension (with dot) for a content type
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("video") {
        if ct.contains("mp4") {
            ".mp4"
        } else if ct.contains("webm") {
            ".webm"
        } else if ct.contains("quicktime") || ct.contains("mov") {
            ".mov"
        } else {
            ".mp4"
        }
    } else if ct.contains("image") {
        if ct.contains("jpeg") || ct.contains("jpg") {
            ".jpg"
        } else if ct.contains("png") {
            ".png"
        } else if ct.contains("gif") {
            ".gif"
        } else if ct.contains("webp") {
            ".webp"
        } else {
            ".jpg"
        }
    } else if ct.contains("audio") {
        if ct.contains("mpeg") || ct.contains("mp3") {
            ".mp3"
        } else if ct.contains("wav") {
            ".wav"
        } else {
            ".mp3"
        }
    } else {
        ""
    }
}
