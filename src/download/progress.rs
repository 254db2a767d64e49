//! Throttled status updates for an in-flight download.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::core::config;

use super::channel::{ChatChannel, MessageRef};

/// Edits a single status message as a download progresses.
///
/// Progress edits are throttled so the status channel is not flooded;
/// stage transitions (merging, uploading, done) always go through.
pub struct StatusReporter {
    channel: Arc<dyn ChatChannel>,
    message: MessageRef,
    title: String,
    last_edit: Mutex<Instant>,
}

impl StatusReporter {
    pub fn new(channel: Arc<dyn ChatChannel>, message: MessageRef, title: impl Into<String>) -> Self {
        // Backdate the throttle so the very first progress edit goes out.
        let origin = Instant::now()
            .checked_sub(config::progress::edit_interval())
            .unwrap_or_else(Instant::now);
        Self {
            channel,
            message,
            title: title.into(),
            last_edit: Mutex::new(origin),
        }
    }

    pub fn message(&self) -> MessageRef {
        self.message
    }

    /// Report download progress. `percent` is `None` when the total size is
    /// unknown (indeterminate). At most one edit per throttle interval.
    pub async fn downloading(&self, percent: Option<u8>) {
        if !self.should_edit() {
            return;
        }
        let text = match percent {
            Some(p) => format!("⬇️ Downloading {}... {}%", self.title, p),
            None => format!("⬇️ Downloading {}...", self.title),
        };
        self.edit(&text).await;
    }

    /// Report a stage transition (merging, uploading, done). Not throttled.
    pub async fn stage(&self, text: &str) {
        self.touch();
        self.edit(text).await;
    }

    async fn edit(&self, text: &str) {
        if let Err(e) = self.channel.edit_status(&self.message, text).await {
            // Status edits are cosmetic; a failed edit never fails the job.
            log::debug!("Status edit failed for chat {}: {}", self.message.chat_id, e);
        }
    }

    fn should_edit(&self) -> bool {
        let mut last = self.lock_last_edit();
        if last.elapsed() < config::progress::edit_interval() {
            return false;
        }
        *last = Instant::now();
        true
    }

    fn touch(&self) {
        *self.lock_last_edit() = Instant::now();
    }

    fn lock_last_edit(&self) -> MutexGuard<'_, Instant> {
        match self.last_edit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
