use std::fmt;

use crate::core::platform::Platform;

/// Structured error type for download operations.
///
/// Categorized variants so the orchestrator can pick the right user-facing
/// message and retry hint without string-matching internal errors.
#[derive(Debug, Clone)]
pub enum DownloadError {
    /// URL failed syntactic validation for its platform
    InvalidUrl(String),
    /// Extraction ran but found nothing downloadable (private, removed, empty)
    NoMedia(String),
    /// Network-level failure; a retry may succeed
    Transient(String),
    /// Operation exceeded its wall-clock ceiling
    Timeout(String),
    /// ffmpeg failed to combine the audio and video streams
    MergeFailed(String),
    /// Choice token unknown, already consumed, expired, or owned by another requester
    StaleChoice,
    /// File was produced but could not be sent through the chat channel
    SendFailed(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::InvalidUrl(msg)
            | DownloadError::NoMedia(msg)
            | DownloadError::Transient(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::MergeFailed(msg)
            | DownloadError::SendFailed(msg) => write!(f, "{}", msg),
            DownloadError::StaleChoice => write!(f, "choice token is no longer valid"),
        }
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for logging and metrics
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::InvalidUrl(_) => "invalid_url",
            DownloadError::NoMedia(_) => "no_media",
            DownloadError::Transient(_) => "transient",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::MergeFailed(_) => "merge_failed",
            DownloadError::StaleChoice => "stale_choice",
            DownloadError::SendFailed(_) => "send_failed",
        }
    }

    /// Whether suggesting a retry to the user makes sense.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DownloadError::Transient(_) | DownloadError::Timeout(_) | DownloadError::SendFailed(_)
        )
    }

    /// The single user-facing message for this failure.
    ///
    /// Never exposes the internal error string; wording depends on the
    /// platform only where it helps the user act on it.
    pub fn user_message(&self, platform: Platform) -> String {
        let source = match platform {
            Platform::Unknown => "the".to_string(),
            p => p.display_name().to_string(),
        };

        match self {
            DownloadError::InvalidUrl(_) => format!(
                "That doesn't look like a valid {} video link. Please check the URL and try again.",
                source
            ),
            DownloadError::NoMedia(_) => format!(
                "Sorry, there was an error downloading the {} video. Please make sure the video is public and try again.",
                source
            ),
            DownloadError::Transient(_) => {
                "Sorry, something went wrong while downloading. Please try again in a few minutes.".to_string()
            }
            DownloadError::Timeout(_) => {
                "The download took too long and was cancelled. Please try again later.".to_string()
            }
            DownloadError::MergeFailed(_) => {
                "The streams were downloaded but combining audio and video failed. Please try another quality."
                    .to_string()
            }
            DownloadError::StaleChoice => {
                "These options have expired. Send the link again to get a fresh menu.".to_string()
            }
            DownloadError::SendFailed(_) => {
                "The file was downloaded but could not be delivered. Please try again.".to_string()
            }
        }
    }
}
