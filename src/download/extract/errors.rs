//! Classification of yt-dlp failures into the download error taxonomy.
//!
//! Permanent conditions (private/removed/unsupported content) must not be
//! presented as retryable; network-shaped conditions must be.

use crate::download::error::DownloadError;

/// Map yt-dlp stderr to a categorized error.
pub fn classify_ytdlp_stderr(stderr: &str) -> DownloadError {
    let lowered = stderr.to_lowercase();
    let context = first_error_line(stderr);

    if lowered.contains("is not a valid url") || lowered.contains("unsupported url") {
        return DownloadError::InvalidUrl(context);
    }

    let permanent_markers = [
        "private video",
        "this video is unavailable",
        "video unavailable",
        "has been removed",
        "account has been terminated",
        "members-only",
        "login required",
        "sign in to confirm your age",
        "no video formats found",
        "unable to extract",
        "requested content is not available",
    ];
    if permanent_markers.iter().any(|marker| lowered.contains(marker)) {
        return DownloadError::NoMedia(context);
    }

    let transient_markers = [
        "timed out",
        "timeout",
        "connection reset",
        "connection refused",
        "temporary failure",
        "name resolution",
        "network is unreachable",
        "unable to download webpage",
        "http error 429",
        "too many requests",
        "http error 5",
        "sign in to confirm you're not a bot",
    ];
    if transient_markers.iter().any(|marker| lowered.contains(marker)) {
        return DownloadError::Transient(context);
    }

    // Unknown failures default to retryable; a wrong retry hint is cheaper
    // for the user than a wrong "this content is gone".
    DownloadError::Transient(context)
}

/// The most useful single line of stderr for log context.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|line| line.starts_with("ERROR"))
        .or_else(|| stderr.lines().find(|line| !line.trim().is_empty()))
        .unwrap_or("yt-dlp failed with empty stderr")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_video_is_permanent() {
        let err = classify_ytdlp_stderr("ERROR: [facebook] 123: Private video. Sign in if you've been granted access");
        assert!(matches!(err, DownloadError::NoMedia(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_removed_video_is_permanent() {
        let err = classify_ytdlp_stderr("ERROR: This video has been removed by the uploader");
        assert!(matches!(err, DownloadError::NoMedia(_)));
    }

    #[test]
    fn test_network_errors_are_transient() {
        for stderr in [
            "ERROR: Unable to download webpage: <urlopen error timed out>",
            "ERROR: unable to download video data: HTTP Error 429: Too Many Requests",
            "ERROR: Connection reset by peer",
        ] {
            let err = classify_ytdlp_stderr(stderr);
            assert!(err.is_transient(), "expected transient for: {}", stderr);
        }
    }

    #[test]
    fn test_invalid_url_is_its_own_bucket() {
        let err = classify_ytdlp_stderr("ERROR: 'not-a-link' is not a valid URL.");
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
    }

    #[test]
    fn test_unknown_failure_defaults_to_transient() {
        let err = classify_ytdlp_stderr("ERROR: something novel happened");
        assert!(matches!(err, DownloadError::Transient(_)));
    }

    #[test]
    fn test_first_error_line_prefers_error_prefix() {
        let stderr = "WARNING: unrelated noise\nERROR: the real cause\nmore detail";
        assert_eq!(first_error_line(stderr), "ERROR: the real cause");
    }

    #[test]
    fn test_first_error_line_empty_stderr() {
        assert_eq!(first_error_line(""), "yt-dlp failed with empty stderr");
    }
}
