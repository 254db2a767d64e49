use thiserror::Error;

use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// All errors outside the download pipeline are converted to this enum for
/// consistent handling. Uses `thiserror` for automatic conversion and
/// display formatting. Pipeline-internal failures use the categorized
/// [`DownloadError`] and only cross into `AppError` at the boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (e.g. empty bot token)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Download pipeline errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("BOT_TOKEN not set".into());
        assert_eq!(err.to_string(), "Configuration error: BOT_TOKEN not set");
    }

    #[test]
    fn test_download_error_conversion() {
        let err: AppError = DownloadError::MergeFailed("exit code 1".into()).into();
        assert!(matches!(err, AppError::Download(_)));
    }
}
