//! Instagram direct-message inbox bridge.
//!
//! Polls the inbox for unread media shares and relays them to the linked
//! Telegram account through the download pipeline. This module has zero
//! teloxide dependency; delivery goes through the pipeline's channel.

pub mod instagram;
pub mod poller;
pub mod traits;

pub use instagram::InstagramInbox;
pub use poller::start_inbox_poller;
pub use traits::{DirectInbox, InboxShare};
