//! Download pipeline: extraction, negotiation, fetching, merging, delivery

pub mod channel;
pub mod choice;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod job;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod rendition;

// Re-exports for convenience
pub use channel::{ChatChannel, ChoiceOption, MessageRef};
pub use error::DownloadError;
pub use pipeline::Pipeline;
pub use rendition::Rendition;
