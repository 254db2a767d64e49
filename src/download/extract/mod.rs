//! Media extraction: resolving an inbound URL to downloadable streams.

pub mod errors;
mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use async_trait::async_trait;
use url::Url;

use crate::core::platform::Platform;

use super::error::DownloadError;
use super::rendition::Rendition;

/// What extraction produced for a URL.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Full rendition list; the requester picks a format interactively.
    Renditions { title: String, renditions: Vec<Rendition> },
    /// Single resolved direct media URL; downloaded as-is.
    Direct { title: String, url: String },
}

/// Extraction as seen by the pipeline.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(&self, platform: Platform, url: &Url) -> Result<Extraction, DownloadError>;
}
