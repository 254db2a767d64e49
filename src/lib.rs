//! Clipferry - Telegram bot that downloads and relays videos
//!
//! This library provides all the functionality for the Clipferry bot:
//! URL classification, media extraction, the format-selection dialog,
//! concurrent stream fetching, audio/video merging and delivery, plus the
//! Instagram direct-message bridge.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, platform classification
//! - `storage`: user records and download history (SQLite)
//! - `download`: extraction, negotiation, fetching, merging, the pipeline
//! - `telegram`: Telegram bot integration and handlers
//! - `watcher`: Instagram inbox polling

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;
pub mod watcher;

// Re-export commonly used types for convenience
pub use self::core::{config, AppError, Platform};
pub use self::download::{DownloadError, Pipeline};
pub use self::storage::{create_pool, get_connection, DbConnection, DbPool};
