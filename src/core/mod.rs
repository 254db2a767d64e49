//! Core utilities: configuration, errors, logging and URL classification

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod web_server;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use platform::Platform;
