//! yt-dlp-backed extractor.
//!
//! YouTube URLs get the full rendition list from `--dump-json`; the
//! single-URL platforms (Facebook, LinkedIn, TikTok) resolve to one direct
//! media URL with `-f best`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use url::Url;

use crate::core::config;
use crate::core::platform::Platform;
use crate::download::cookies::CookiePool;
use crate::download::error::DownloadError;
use crate::download::rendition::Rendition;

use super::errors::classify_ytdlp_stderr;
use super::{Extraction, MediaExtractor};

/// Recognizable YouTube video URL shapes. Anything else fails fast as
/// `InvalidUrl` before a subprocess is spawned.
static YOUTUBE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(https?://)?(www\.|m\.|music\.)?(youtube\.com/(watch\?v=|shorts/|embed/|live/)[\w-]{6,}|youtu\.be/[\w-]{6,})",
    )
    .expect("static pattern")
});

pub struct YtDlpExtractor {
    ytdl_bin: String,
}

impl YtDlpExtractor {
    pub fn new() -> Self {
        Self {
            ytdl_bin: config::YTDL_BIN.clone(),
        }
    }

    async fn run_dump_json(&self, url: &Url, format: Option<&str>) -> Result<Value, DownloadError> {
        let mut args: Vec<String> = vec!["--dump-json".into(), "--no-playlist".into()];
        if let Some(format) = format {
            args.push("-f".into());
            args.push(format.into());
        }
        if let Some(cookie) = CookiePool::global().current().await {
            args.push("--add-headers".into());
            args.push(format!("Cookie:{}", cookie));
        }
        args.push(url.as_str().into());

        log::debug!("Running {} --dump-json for {}", self.ytdl_bin, url);

        let result = timeout(
            config::download::ytdlp_timeout(),
            TokioCommand::new(&self.ytdl_bin).args(&args).output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DownloadError::Transient(format!(
                    "failed to run {}: {}",
                    self.ytdl_bin, e
                )))
            }
            Err(_) => {
                return Err(DownloadError::Timeout(format!(
                    "yt-dlp metadata fetch timed out after {}s",
                    config::download::YTDLP_TIMEOUT_SECS
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = classify_ytdlp_stderr(&stderr);
            // A stale cookie context should not poison the next request.
            if err.is_transient() {
                CookiePool::global().invalidate().await;
            }
            return Err(err);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim())
            .map_err(|e| DownloadError::Transient(format!("unparseable yt-dlp output: {}", e)))
    }

    async fn extract_renditions(&self, url: &Url) -> Result<Extraction, DownloadError> {
        if !YOUTUBE_URL_RE.is_match(url.as_str()) {
            return Err(DownloadError::InvalidUrl(format!(
                "not a recognizable YouTube video URL: {}",
                url
            )));
        }

        let json = self.run_dump_json(url, None).await?;
        let title = video_title(&json);
        let renditions = parse_renditions(&json);

        if renditions.is_empty() {
            return Err(DownloadError::NoMedia(format!("no downloadable formats for {}", url)));
        }

        log::info!("Extracted {} renditions for \"{}\"", renditions.len(), title);
        Ok(Extraction::Renditions { title, renditions })
    }

    async fn resolve_direct(&self, url: &Url) -> Result<Extraction, DownloadError> {
        let json = self.run_dump_json(url, Some("best")).await?;
        let title = video_title(&json);

        match direct_url_from_json(&json) {
            Some(media_url) => {
                log::info!("Resolved direct media URL for \"{}\"", title);
                Ok(Extraction::Direct { title, url: media_url })
            }
            None => Err(DownloadError::NoMedia(format!(
                "no downloadable media URL found for {}",
                url
            ))),
        }
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(&self, platform: Platform, url: &Url) -> Result<Extraction, DownloadError> {
        match platform {
            Platform::YouTube => self.extract_renditions(url).await,
            Platform::Facebook | Platform::LinkedIn | Platform::TikTok => self.resolve_direct(url).await,
            Platform::Unknown => Err(DownloadError::NoMedia(format!("unsupported platform for {}", url))),
        }
    }
}

fn video_title(json: &Value) -> String {
    json.get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("video")
        .to_string()
}

/// Map yt-dlp's `formats[]` into renditions.
///
/// Segmented/manifest formats (HLS/DASH) are skipped; the byte-level
/// fetcher only handles plain HTTP(S) streams.
fn parse_renditions(json: &Value) -> Vec<Rendition> {
    let formats = match json.get("formats").and_then(|v| v.as_array()) {
        Some(formats) => formats,
        None => return Vec::new(),
    };

    let mut renditions = Vec::new();
    for format in formats {
        let source_url = match format.get("url").and_then(|v| v.as_str()) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => continue,
        };

        let protocol = format.get("protocol").and_then(|v| v.as_str()).unwrap_or("https");
        if protocol.starts_with("m3u8") || protocol == "http_dash_segments" {
            continue;
        }

        let vcodec = format.get("vcodec").and_then(|v| v.as_str()).unwrap_or("none");
        let acodec = format.get("acodec").and_then(|v| v.as_str()).unwrap_or("none");
        let has_video = vcodec != "none";
        let has_audio = acodec != "none";
        if !has_video && !has_audio {
            continue;
        }

        let container = format
            .get("ext")
            .and_then(|v| v.as_str())
            .unwrap_or(if has_video { "mp4" } else { "m4a" })
            .to_string();

        let quality_label = format
            .get("format_note")
            .and_then(|v| v.as_str())
            .filter(|note| !note.is_empty())
            .map(str::to_string)
            .or_else(|| {
                format
                    .get("height")
                    .and_then(|v| v.as_u64())
                    .map(|height| format!("{}p", height))
            })
            .unwrap_or_else(|| if has_video { "video".into() } else { "audio".into() });

        let bitrate = format
            .get("tbr")
            .or_else(|| format.get("abr"))
            .and_then(|v| v.as_f64());

        renditions.push(Rendition {
            source_url,
            container,
            quality_label,
            has_audio,
            has_video,
            bitrate,
        });
    }

    renditions
}

/// The single resolved media URL from a `-f best` dump.
fn direct_url_from_json(json: &Value) -> Option<String> {
    if let Some(url) = json.get("url").and_then(|v| v.as_str()) {
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }

    // Fall back to the best muxed entry in formats[].
    parse_renditions(json)
        .into_iter()
        .filter(|r| r.has_video && r.has_audio)
        .max_by(|a, b| {
            a.bitrate
                .unwrap_or(0.0)
                .partial_cmp(&b.bitrate.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|r| r.source_url)
}
