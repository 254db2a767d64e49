//! Per-request download orchestration.
//!
//! Drives classify → extract → negotiate → fetch → (merge) → deliver for
//! each inbound URL. Every exit path reaches the job's cleanup exactly
//! once, and the requester gets exactly one terminal message.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::timeout;
use url::Url;
use uuid::Uuid;

use crate::core::config;
use crate::core::platform::Platform;
use crate::storage::db;
use crate::storage::{get_connection, DbPool};

use super::channel::{ChatChannel, ChoiceOption};
use super::choice::{ChoiceRegistry, ChoiceStage};
use super::error::DownloadError;
use super::extract::{Extraction, MediaExtractor};
use super::fetch::Fetcher;
use super::job::{JobHandle, JobRegistry};
use super::merge::Merger;
use super::progress::StatusReporter;
use super::rendition::{self, Rendition};

/// Static guidance for links the classifier cannot place. Not an error and
/// not a retry suggestion.
pub const UNSUPPORTED_GUIDANCE: &str =
    "Sorry, this link is not supported yet. Currently, I can download YouTube, Facebook, LinkedIn, and TikTok videos.";

/// The per-request download orchestrator.
///
/// All collaborators sit behind traits so the whole flow runs against mocks
/// in tests; the only shared mutable state is the choice table and the
/// active-job registry, both internally synchronized.
pub struct Pipeline {
    channel: Arc<dyn ChatChannel>,
    extractor: Arc<dyn MediaExtractor>,
    fetcher: Arc<dyn Fetcher>,
    merger: Arc<dyn Merger>,
    choices: ChoiceRegistry,
    jobs: JobRegistry,
    db_pool: Arc<DbPool>,
    temp_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        extractor: Arc<dyn MediaExtractor>,
        fetcher: Arc<dyn Fetcher>,
        merger: Arc<dyn Merger>,
        db_pool: Arc<DbPool>,
    ) -> Self {
        Self {
            channel,
            extractor,
            fetcher,
            merger,
            choices: ChoiceRegistry::new(),
            jobs: JobRegistry::new(),
            db_pool,
            temp_dir: PathBuf::from(config::TEMP_FILES_DIR.as_str()),
        }
    }

    /// Override the temp directory (tests use an isolated one).
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Entry point for an inbound chat message.
    pub async fn handle_url(&self, requester: i64, text: &str) {
        // A new request supersedes any menu the requester left unanswered.
        self.choices.invalidate_for(requester);

        let platform = Platform::classify(text);
        if !platform.is_supported() {
            self.send_or_log(requester, UNSUPPORTED_GUIDANCE).await;
            return;
        }

        match get_connection(&self.db_pool) {
            Ok(conn) => {
                if let Err(e) = db::ensure_user(&conn, requester) {
                    log::error!("Failed to ensure user {}: {}", requester, e);
                }
            }
            Err(e) => log::error!("DB connection error: {}", e),
        }

        let url = match parse_request_url(text) {
            Some(url) => url,
            None => {
                let err = DownloadError::InvalidUrl(format!("unparseable request: {}", text));
                self.report_failure(requester, platform, text, &err).await;
                return;
            }
        };

        log::info!("📥 {} request from {}: {}", platform.display_name(), requester, url);

        match self.extractor.extract(platform, &url).await {
            Err(err) => self.report_failure(requester, platform, url.as_str(), &err).await,
            Ok(Extraction::Direct { title, url: media_url }) => {
                let direct = direct_rendition(&media_url);
                self.download_resolved(requester, platform, &url, &title, direct, None)
                    .await;
            }
            Ok(Extraction::Renditions { title, renditions }) => {
                self.present_media_type_menu(requester, platform, url, title, renditions)
                    .await;
            }
        }
    }

    /// Entry point for an answered menu (callback query).
    pub async fn handle_choice(&self, requester: i64, token: Uuid, index: usize) {
        let pending = match self.choices.consume(requester, token) {
            Ok(pending) => pending,
            Err(err) => {
                log::info!("Stale choice from {}: token {}", requester, token);
                self.send_or_log(requester, &err.user_message(Platform::Unknown)).await;
                return;
            }
        };

        match pending.stage {
            ChoiceStage::MediaType {
                platform,
                url,
                title,
                renditions,
            } => match index {
                0 => match rendition::best_audio(&renditions) {
                    Some(audio) => {
                        self.download_resolved(requester, platform, &url, &title, audio, None)
                            .await;
                    }
                    None => {
                        let err = DownloadError::NoMedia("no audio-only rendition available".into());
                        self.report_failure(requester, platform, url.as_str(), &err).await;
                    }
                },
                1 => {
                    self.present_quality_menu(requester, platform, url, title, renditions)
                        .await;
                }
                _ => {
                    self.send_or_log(requester, &DownloadError::StaleChoice.user_message(platform))
                        .await;
                }
            },
            ChoiceStage::Quality {
                platform,
                url,
                title,
                candidates,
                best_audio,
            } => match candidates.get(index) {
                None => {
                    self.send_or_log(requester, &DownloadError::StaleChoice.user_message(platform))
                        .await;
                }
                Some(video) => {
                    // A rendition that already carries audio needs no merge;
                    // otherwise pair it with the best separate audio stream.
                    let extra_audio = if video.has_audio { None } else { best_audio };
                    if !video.has_audio && extra_audio.is_none() {
                        let err = DownloadError::NoMedia("selected quality has no usable audio stream".into());
                        self.report_failure(requester, platform, url.as_str(), &err).await;
                    } else {
                        self.download_resolved(requester, platform, &url, &title, video.clone(), extra_audio)
                            .await;
                    }
                }
            },
        }
    }

    /// Deliver an already-resolved direct media URL (Instagram inbox path).
    /// Returns whether the file actually reached the chat.
    pub async fn deliver_direct(&self, chat_id: i64, media_url: &str, caption: &str) -> bool {
        let source = match Url::parse(media_url) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Inbox share has invalid media URL for chat {}: {}", chat_id, e);
                return false;
            }
        };
        let direct = direct_rendition(media_url);
        self.download_resolved(chat_id, Platform::Unknown, &source, caption, direct, None)
            .await
    }

    async fn present_media_type_menu(
        &self,
        requester: i64,
        platform: Platform,
        url: Url,
        title: String,
        renditions: Vec<Rendition>,
    ) {
        let prompt = format!("What would you like to download for \"{}\"?", title);
        let options = [ChoiceOption::new(0, "🎵 Audio"), ChoiceOption::new(1, "🎬 Video")];
        let stage = ChoiceStage::MediaType {
            platform,
            url: url.clone(),
            title,
            renditions,
        };

        let token = self.choices.issue(requester, stage);
        if let Err(e) = self.channel.present_choices(requester, &prompt, &options, token).await {
            self.choices.invalidate_for(requester);
            let err = DownloadError::SendFailed(e);
            self.report_failure(requester, platform, url.as_str(), &err).await;
        }
    }

    async fn present_quality_menu(
        &self,
        requester: i64,
        platform: Platform,
        url: Url,
        title: String,
        renditions: Vec<Rendition>,
    ) {
        let candidates = rendition::video_candidates(&renditions);
        if candidates.is_empty() {
            let err = DownloadError::NoMedia("no video renditions available".into());
            self.report_failure(requester, platform, url.as_str(), &err).await;
            return;
        }

        let options: Vec<ChoiceOption> = candidates
            .iter()
            .enumerate()
            .map(|(index, r)| ChoiceOption::new(index, format!("{} ({})", r.quality_label, r.container)))
            .collect();
        let prompt = format!("Pick a quality for \"{}\":", title);

        let best_audio = rendition::best_audio(&renditions);
        let stage = ChoiceStage::Quality {
            platform,
            url: url.clone(),
            title,
            candidates,
            best_audio,
        };

        let token = self.choices.issue(requester, stage);
        if let Err(e) = self.channel.present_choices(requester, &prompt, &options, token).await {
            self.choices.invalidate_for(requester);
            let err = DownloadError::SendFailed(e);
            self.report_failure(requester, platform, url.as_str(), &err).await;
        }
    }

    /// Fetch a resolved rendition (plus an optional separate audio stream),
    /// merge if needed, deliver, then clean up on every exit path.
    /// Returns whether the file was delivered.
    async fn download_resolved(
        &self,
        requester: i64,
        platform: Platform,
        url: &Url,
        title: &str,
        primary: Rendition,
        extra_audio: Option<Rendition>,
    ) -> bool {
        let (job, displaced) = self.jobs.begin(requester);
        if let Some(previous) = displaced {
            log::info!("Superseding active job for {}; cleaning its temp files", requester);
            previous.cleanup().await;
        }

        let status = match self
            .channel
            .send_text(requester, &format!("⏳ Starting download of \"{}\"...", title))
            .await
        {
            Ok(message) => Some(StatusReporter::new(Arc::clone(&self.channel), message, title)),
            Err(e) => {
                log::warn!("Could not send status message to {}: {}", requester, e);
                None
            }
        };

        let result = match timeout(
            config::download::pipeline_ceiling(),
            self.run_resolved(&job, requester, &primary, extra_audio.as_ref(), title, status.as_ref()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DownloadError::Timeout(format!(
                "pipeline exceeded {}s ceiling",
                config::download::PIPELINE_MAX_SECS
            ))),
        };

        job.cleanup().await;
        self.jobs.finish(requester, &job);

        match result {
            Ok(true) => {
                match get_connection(&self.db_pool) {
                    Ok(conn) => {
                        if let Err(e) = db::append_download(&conn, requester, url.as_str()) {
                            log::error!("Failed to record download for {}: {}", requester, e);
                        }
                    }
                    Err(e) => log::error!("DB connection error: {}", e),
                }
                let done = format!("✅ \"{}\" delivered. Enjoy!", title);
                match &status {
                    Some(reporter) => reporter.stage(&done).await,
                    None => self.send_or_log(requester, &done).await,
                }
                true
            }
            Ok(false) => {
                // Superseded by a newer request from the same requester; the
                // successor owns the conversation from here.
                log::info!("Job for {} superseded before delivery; skipping message", requester);
                false
            }
            Err(err) => {
                if job.is_superseded() {
                    log::info!("Superseded job for {} failed quietly: {}", requester, err);
                } else {
                    self.report_failure(requester, platform, url.as_str(), &err).await;
                }
                false
            }
        }
    }

    async fn run_resolved(
        &self,
        job: &JobHandle,
        requester: i64,
        primary: &Rendition,
        extra_audio: Option<&Rendition>,
        title: &str,
        status: Option<&StatusReporter>,
    ) -> Result<bool, DownloadError> {
        let deliverable = match extra_audio {
            None => {
                let dest = job.claim_temp(&self.temp_dir, &primary.container);
                self.fetcher.fetch(&primary.source_url, &dest, status).await?;
                dest
            }
            Some(audio) => {
                let video_path = job.claim_temp(&self.temp_dir, &primary.container);
                let audio_path = job.claim_temp(&self.temp_dir, &audio.container);

                // Both streams fetched concurrently; the merge waits on both.
                // If either fails the other is dropped mid-flight and both
                // partial files stay claimed for cleanup.
                tokio::try_join!(
                    self.fetcher.fetch(&primary.source_url, &video_path, status),
                    self.fetcher.fetch(&audio.source_url, &audio_path, None),
                )?;

                if let Some(reporter) = status {
                    reporter.stage("🔀 Merging audio and video...").await;
                }
                let output = job.claim_temp(&self.temp_dir, "mp4");
                self.merger.merge(&video_path, &audio_path, &output).await?;
                output
            }
        };

        if job.is_superseded() {
            return Ok(false);
        }

        if let Some(reporter) = status {
            reporter.stage("📤 Uploading...").await;
        }
        self.channel
            .send_file(requester, &deliverable, title)
            .await
            .map_err(DownloadError::SendFailed)?;

        Ok(true)
    }

    async fn report_failure(&self, requester: i64, platform: Platform, url: &str, err: &DownloadError) {
        log::error!(
            "❌ Download failed: platform={} url={} requester={} category={} cause={}",
            platform.as_str(),
            url,
            requester,
            err.subcategory(),
            err
        );
        self.send_or_log(requester, &err.user_message(platform)).await;
    }

    async fn send_or_log(&self, requester: i64, text: &str) {
        if let Err(e) = self.channel.send_text(requester, text).await {
            log::error!("Failed to message chat {}: {}", requester, e);
        }
    }
}

/// Parse the request into a URL, tolerating a missing scheme.
fn parse_request_url(text: &str) -> Option<Url> {
    let trimmed = text.trim();
    Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
        .ok()
}

/// Wrap an already-resolved direct media URL as a muxed rendition so it
/// flows through the same fetch/deliver/cleanup path.
fn direct_rendition(media_url: &str) -> Rendition {
    Rendition {
        source_url: media_url.to_string(),
        container: "mp4".into(),
        quality_label: "direct".into(),
        has_audio: true,
        has_video: true,
        bitrate: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_url_with_scheme() {
        let url = parse_request_url("https://youtu.be/abc123").unwrap();
        assert_eq!(url.as_str(), "https://youtu.be/abc123");
    }

    #[test]
    fn test_parse_request_url_without_scheme() {
        let url = parse_request_url("www.youtube.com/watch?v=abc123").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("www.youtube.com"));
    }

    #[test]
    fn test_direct_rendition_is_muxed() {
        let r = direct_rendition("https://cdn.example/clip.mp4");
        assert!(r.has_audio && r.has_video);
        assert_eq!(r.container, "mp4");
    }
}
