//! Contract the pipeline needs from the chat transport.
//!
//! No teloxide types cross this boundary and errors are plain strings, so
//! the pipeline and its tests never depend on the Telegram API surface.

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

/// Handle to a previously sent status message, for later edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// One selectable option in a presented menu.
#[derive(Debug, Clone)]
pub struct ChoiceOption {
    /// Index echoed back when the requester picks this option
    pub index: usize,
    /// Button label
    pub label: String,
}

impl ChoiceOption {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
        }
    }
}

/// Chat transport as seen by the download pipeline.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Send a plain text message; returns a handle for later edits.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<MessageRef, String>;

    /// Edit a previously sent status message in place.
    async fn edit_status(&self, message: &MessageRef, text: &str) -> Result<(), String>;

    /// Send a local media file with a caption.
    async fn send_file(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), String>;

    /// Present options; the requester's pick comes back through the choice
    /// dispatcher carrying `token` and the option index.
    async fn present_choices(
        &self,
        chat_id: i64,
        prompt: &str,
        options: &[ChoiceOption],
        token: Uuid,
    ) -> Result<MessageRef, String>;
}
