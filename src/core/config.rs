use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "database.sqlite".to_string()));

/// Temporary files directory for in-flight downloads
/// Read from TEMP_FILES_DIR environment variable, supports tilde (~) expansion
pub static TEMP_FILES_DIR: Lazy<String> = Lazy::new(|| {
    let raw = env::var("TEMP_FILES_DIR").unwrap_or_else(|_| "/tmp".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: clipferry.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "clipferry.log".to_string()));

/// Port for the public HTTP surface (health check + Instagram relay stub)
/// Read from WEB_PORT (falls back to PORT), default 3000
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEB_PORT")
        .or_else(|_| env::var("PORT"))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Cached ffmpeg binary path
/// Read once at startup from FFMPEG_BIN environment variable or defaults to "ffmpeg"
pub static FFMPEG_BIN: Lazy<String> = Lazy::new(|| env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()));

/// Instagram account used for the direct-message bridge
/// When either variable is missing the bridge stays disabled.
pub static INSTAGRAM_USERNAME: Lazy<Option<String>> = Lazy::new(|| env::var("INSTAGRAM_USERNAME").ok());
pub static INSTAGRAM_PASSWORD: Lazy<Option<String>> = Lazy::new(|| env::var("INSTAGRAM_PASSWORD").ok());

/// Download configuration
pub mod download {
    use super::Duration;

    /// Timeout for yt-dlp commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// Timeout for the ffmpeg merge step (in seconds)
    pub const MERGE_TIMEOUT_SECS: u64 = 300;

    /// Ceiling on total fetch/merge/deliver wall time per request (in seconds)
    pub const PIPELINE_MAX_SECS: u64 = 900;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    /// ffmpeg merge timeout duration
    pub fn merge_timeout() -> Duration {
        Duration::from_secs(MERGE_TIMEOUT_SECS)
    }

    /// Per-request pipeline ceiling duration
    pub fn pipeline_ceiling() -> Duration {
        Duration::from_secs(PIPELINE_MAX_SECS)
    }
}

/// Progress reporting configuration
pub mod progress {
    use super::Duration;

    /// Minimum interval between status-message edits (in seconds)
    pub const EDIT_INTERVAL_SECS: u64 = 2;

    /// Edit throttle duration
    pub fn edit_interval() -> Duration {
        Duration::from_secs(EDIT_INTERVAL_SECS)
    }
}

/// Format-selection dialog configuration
pub mod choice {
    use super::Duration;

    /// How long a presented menu stays answerable (in seconds)
    pub const TTL_SECS: u64 = 600;

    /// Menu time-to-live duration
    pub fn ttl() -> Duration {
        Duration::from_secs(TTL_SECS)
    }
}

/// Instagram inbox polling configuration
pub mod watcher {
    use super::Duration;

    /// Interval between inbox polls (in seconds)
    pub const POLL_INTERVAL_SECS: u64 = 60;

    /// Poll interval duration
    pub fn poll_interval() -> Duration {
        Duration::from_secs(POLL_INTERVAL_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Connect timeout for outbound HTTP requests (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Connect timeout duration
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_timeout_constants_are_sane() {
        // The merge step must fit inside the overall pipeline ceiling.
        assert!(super::download::MERGE_TIMEOUT_SECS < super::download::PIPELINE_MAX_SECS);
        assert!(super::download::YTDLP_TIMEOUT_SECS < super::download::PIPELINE_MAX_SECS);
    }

    #[test]
    fn test_durations_match_constants() {
        assert_eq!(
            super::progress::edit_interval().as_secs(),
            super::progress::EDIT_INTERVAL_SECS
        );
        assert_eq!(super::choice::ttl().as_secs(), super::choice::TTL_SECS);
        assert_eq!(
            super::watcher::poll_interval().as_secs(),
            super::watcher::POLL_INTERVAL_SECS
        );
    }
}
