//! Streaming fetch of a resolved media URL to a local file.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::core::config;

use super::error::DownloadError;
use super::progress::StatusReporter;

/// Byte-level fetcher as seen by the pipeline. Implementations must support
/// two concurrent invocations (separate video and audio streams).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Stream `url` into `dest`, reporting progress when a reporter is given.
    /// On failure the partially written file is left in place; the owning
    /// job removes it during cleanup.
    async fn fetch(&self, url: &str, dest: &Path, status: Option<&StatusReporter>) -> Result<(), DownloadError>;
}

/// reqwest-backed fetcher used in production.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config::network::connect_timeout())
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path, status: Option<&StatusReporter>) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Transient(format!("request to source failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DownloadError::Transient(format!(
                "source returned HTTP {}",
                response.status()
            )));
        }

        let total_size = response.content_length().filter(|size| *size > 0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DownloadError::Transient(format!("cannot create {}: {}", dest.display(), e)))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Transient(format!("source stream failed: {}", e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::Transient(format!("disk write failed: {}", e)))?;
            downloaded += chunk.len() as u64;

            if let Some(reporter) = status {
                let percent = total_size.map(|total| ((downloaded * 100) / total).min(100) as u8);
                reporter.downloading(percent).await;
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::Transient(format!("disk flush failed: {}", e)))?;

        log::debug!("Fetched {} bytes into {}", downloaded, dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_body_to_dest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake video bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let fetcher = HttpFetcher::new();

        fetcher
            .fetch(&format!("{}/clip.mp4", server.uri()), &dest, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"fake video bytes");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("gone.mp4");
        let fetcher = HttpFetcher::new();

        let err = fetcher
            .fetch(&format!("{}/gone.mp4", server.uri()), &dest, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transient(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transient() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("never.mp4");
        let fetcher = HttpFetcher::new();

        let err = fetcher
            // Port 1 on loopback; the connection is refused immediately.
            .fetch("http://127.0.0.1:1/never.mp4", &dest, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Transient(_)));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_do_not_interfere() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/audio.m4a"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let video_dest = dir.path().join("video.mp4");
        let audio_dest = dir.path().join("audio.m4a");
        let fetcher = HttpFetcher::new();

        let video_url = format!("{}/video.mp4", server.uri());
        let audio_url = format!("{}/audio.m4a", server.uri());
        let (video, audio) = tokio::join!(
            fetcher.fetch(&video_url, &video_dest, None),
            fetcher.fetch(&audio_url, &audio_dest, None),
        );
        video.unwrap();
        audio.unwrap();

        assert_eq!(std::fs::read(&video_dest).unwrap(), b"video");
        assert_eq!(std::fs::read(&audio_dest).unwrap(), b"audio");
    }
}
