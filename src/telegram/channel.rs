//! teloxide-backed implementation of the pipeline's chat contract.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId};
use uuid::Uuid;

use crate::download::channel::{ChatChannel, ChoiceOption, MessageRef};
use crate::telegram::Bot;

/// Callback-data prefix for format-selection buttons.
const PICK_PREFIX: &str = "pick";

/// Encode a choice button's callback data: `pick:<token>:<index>`.
pub fn callback_data(token: Uuid, index: usize) -> String {
    format!("{}:{}:{}", PICK_PREFIX, token, index)
}

/// Decode callback data written by [`callback_data`].
pub fn parse_callback_data(data: &str) -> Option<(Uuid, usize)> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != PICK_PREFIX {
        return None;
    }
    let token = Uuid::parse_str(parts.next()?).ok()?;
    let index = parts.next()?.parse().ok()?;
    Some((token, index))
}

/// Telegram transport for the download pipeline.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<MessageRef, String> {
        let message = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| e.to_string())?;
        Ok(MessageRef {
            chat_id,
            message_id: message.id.0,
        })
    }

    async fn edit_status(&self, message: &MessageRef, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
            .map(drop)
            .map_err(|e| e.to_string())
    }

    async fn send_file(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), String> {
        self.bot
            .send_video(ChatId(chat_id), InputFile::file(path.to_path_buf()))
            .caption(caption.to_string())
            .await
            .map(drop)
            .map_err(|e| e.to_string())
    }

    async fn present_choices(
        &self,
        chat_id: i64,
        prompt: &str,
        options: &[ChoiceOption],
        token: Uuid,
    ) -> Result<MessageRef, String> {
        let rows: Vec<Vec<InlineKeyboardButton>> = options
            .iter()
            .map(|option| {
                vec![InlineKeyboardButton::callback(
                    option.label.clone(),
                    callback_data(token, option.index),
                )]
            })
            .collect();

        let message = self
            .bot
            .send_message(ChatId(chat_id), prompt)
            .reply_markup(InlineKeyboardMarkup::new(rows))
            .await
            .map_err(|e| e.to_string())?;

        Ok(MessageRef {
            chat_id,
            message_id: message.id.0,
        })
    }
}
