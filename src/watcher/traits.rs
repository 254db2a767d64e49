//! Core trait and types for the inbox bridge.
//!
//! The poller resolves senders through the user store and hands media to
//! the download pipeline; implementations only speak the source platform's
//! API. Errors are plain strings at this seam.

use async_trait::async_trait;

/// One unread media share found in the direct-message inbox.
#[derive(Debug, Clone)]
pub struct InboxShare {
    /// Sender's numeric account ID on the source platform
    pub sender_id: String,
    /// Sender's username, when the thread metadata exposes it. Account
    /// links are stored by username, so this is the primary lookup key.
    pub sender_username: Option<String>,
    /// Resolved direct media URL
    pub media_url: String,
    /// Caption for delivery
    pub title: String,
    /// Thread the item lives in (needed to mark it seen)
    pub thread_id: String,
    /// The item itself
    pub item_id: String,
}

/// A pollable direct-message inbox on a social platform.
#[async_trait]
pub trait DirectInbox: Send + Sync {
    /// Authenticate. Called before the first poll and again after auth
    /// loss; must be safe to call repeatedly.
    async fn login(&self) -> Result<(), String>;

    /// Unread media shares across all threads.
    async fn unread_shares(&self) -> Result<Vec<InboxShare>, String>;

    /// Message a sender on the *source* platform (used when no account
    /// link exists yet).
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String>;

    /// Mark an inbox item as seen so it is not relayed twice.
    async fn mark_seen(&self, thread_id: &str, item_id: &str) -> Result<(), String>;
}
