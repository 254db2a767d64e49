//! Audio+video merge via ffmpeg.
//!
//! Fixed target profile: H.264 video, AAC audio at 192k, speed-oriented
//! preset. The goal is a playable file, not fidelity to the source encode.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::core::config;

use super::error::DownloadError;

/// Merge step as seen by the pipeline.
#[async_trait]
pub trait Merger: Send + Sync {
    /// Combine a video-only file and an audio-only file into `output`.
    /// On failure no partial output is promised; the owning job's cleanup
    /// removes whatever was written.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DownloadError>;
}

/// ffmpeg-backed merger used in production.
pub struct FfmpegMerger {
    ffmpeg_bin: String,
}

impl FfmpegMerger {
    pub fn new() -> Self {
        Self {
            ffmpeg_bin: config::FFMPEG_BIN.clone(),
        }
    }
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument list for the merge invocation.
fn build_merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        video.display().to_string(),
        "-i".into(),
        audio.display().to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "veryfast".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-movflags".into(),
        "+faststart".into(),
        output.display().to_string(),
    ]
}

#[async_trait]
impl Merger for FfmpegMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DownloadError> {
        let args = build_merge_args(video, audio, output);
        log::debug!("Running {} {}", self.ffmpeg_bin, args.join(" "));

        let result = timeout(
            config::download::merge_timeout(),
            TokioCommand::new(&self.ffmpeg_bin).args(&args).output(),
        )
        .await;

        let command_output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DownloadError::MergeFailed(format!(
                    "failed to run {}: {}",
                    self.ffmpeg_bin, e
                )))
            }
            Err(_) => {
                return Err(DownloadError::MergeFailed(format!(
                    "ffmpeg timed out after {}s",
                    config::download::MERGE_TIMEOUT_SECS
                )))
            }
        };

        if !command_output.status.success() {
            let stderr = String::from_utf8_lossy(&command_output.stderr);
            log::error!("FFmpeg merge error: {}", stderr);
            let first_line = stderr.lines().next().unwrap_or("unknown ffmpeg error");
            return Err(DownloadError::MergeFailed(format!(
                "ffmpeg exited with {:?}: {}",
                command_output.status.code(),
                first_line
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_merge_args_target_profile() {
        let args = build_merge_args(
            &PathBuf::from("/tmp/v.mp4"),
            &PathBuf::from("/tmp/a.m4a"),
            &PathBuf::from("/tmp/out.mp4"),
        );

        // Both inputs, in order.
        let inputs: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| args[i + 1].clone())
            .collect();
        assert_eq!(inputs, vec!["/tmp/v.mp4", "/tmp/a.m4a"]);

        // Fixed target profile: H.264 / AAC at 192k, speed-oriented preset.
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "192k"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "veryfast"]));

        // Overwrite flag present, output last.
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[tokio::test]
    async fn test_merge_with_missing_binary_fails() {
        let merger = FfmpegMerger {
            ffmpeg_bin: "/nonexistent/ffmpeg-binary".into(),
        };
        let err = merger
            .merge(
                &PathBuf::from("/tmp/v.mp4"),
                &PathBuf::from("/tmp/a.m4a"),
                &PathBuf::from("/tmp/out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::MergeFailed(_)));
    }
}
