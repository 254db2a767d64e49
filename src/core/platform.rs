//! Supported source platforms and URL classification.

/// Source platform of an inbound link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    YouTube,
    Facebook,
    LinkedIn,
    TikTok,
    Unknown,
}

impl Platform {
    /// Classify an inbound message into a platform tag.
    ///
    /// Total and deterministic: matching is case-insensitive substring
    /// matching on the host portion, so links without a scheme still
    /// classify, and anything that is not a recognized link (including
    /// plain text) yields `Unknown`. The host patterns are disjoint, so
    /// match order does not matter.
    pub fn classify(text: &str) -> Self {
        let lowered = text.trim().to_lowercase();

        if lowered.contains("youtube.com/") || lowered.contains("youtu.be/") {
            Platform::YouTube
        } else if lowered.contains("facebook.com/") || lowered.contains("fb.watch/") {
            Platform::Facebook
        } else if lowered.contains("linkedin.com/") {
            Platform::LinkedIn
        } else if lowered.contains("tiktok.com/") {
            Platform::TikTok
        } else {
            Platform::Unknown
        }
    }

    /// Human-readable display name for status and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Facebook => "Facebook",
            Platform::LinkedIn => "LinkedIn",
            Platform::TikTok => "TikTok",
            Platform::Unknown => "Unknown",
        }
    }

    /// Stable identifier for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Facebook => "facebook",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
            Platform::Unknown => "unknown",
        }
    }

    /// Whether downloads from this platform are supported at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_youtube_variants() {
        assert_eq!(Platform::classify("https://www.youtube.com/watch?v=abc123"), Platform::YouTube);
        assert_eq!(Platform::classify("https://youtu.be/abc123"), Platform::YouTube);
        assert_eq!(Platform::classify("http://m.youtube.com/watch?v=abc123"), Platform::YouTube);
        assert_eq!(Platform::classify("youtube.com/shorts/xyz"), Platform::YouTube);
    }

    #[test]
    fn test_classify_facebook_variants() {
        assert_eq!(
            Platform::classify("https://www.facebook.com/watch/?v=123"),
            Platform::Facebook
        );
        assert_eq!(Platform::classify("https://fb.watch/abcdef/"), Platform::Facebook);
    }

    #[test]
    fn test_classify_linkedin_and_tiktok() {
        assert_eq!(
            Platform::classify("https://www.linkedin.com/posts/someone_video"),
            Platform::LinkedIn
        );
        assert_eq!(
            Platform::classify("https://www.tiktok.com/@user/video/1234567890"),
            Platform::TikTok
        );
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(Platform::classify("HTTPS://WWW.YOUTUBE.COM/WATCH?V=ABC"), Platform::YouTube);
        assert_eq!(Platform::classify("https://FB.Watch/abc/"), Platform::Facebook);
    }

    #[test]
    fn test_classify_unknown_inputs() {
        // Unmatched hosts and plain text are Unknown, never an error.
        assert_eq!(Platform::classify("https://vimeo.com/12345"), Platform::Unknown);
        assert_eq!(Platform::classify("hello there"), Platform::Unknown);
        assert_eq!(Platform::classify(""), Platform::Unknown);
        assert_eq!(Platform::classify("/start"), Platform::Unknown);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let inputs = ["https://youtu.be/a", "https://www.tiktok.com/@u/video/1", "nope"];
        for input in inputs {
            assert_eq!(Platform::classify(input), Platform::classify(input));
        }
    }

    #[test]
    fn test_supported_flags() {
        assert!(Platform::YouTube.is_supported());
        assert!(Platform::TikTok.is_supported());
        assert!(!Platform::Unknown.is_supported());
    }
}
