//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::download::pipeline::Pipeline;
use crate::storage::db;
use crate::storage::{get_connection, DbPool};
use crate::telegram::bot::Command;
use crate::telegram::channel::parse_callback_data;
use crate::telegram::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

const WELCOME: &str = "👋 Welcome! Send me a video link from YouTube, Facebook, TikTok or LinkedIn and I'll download it for you.\n\nYou can also link your Instagram with /connect_instagram <username> and share videos with our Instagram bot to receive them here.";

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub pipeline: Arc<Pipeline>,
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Returns a handler tree for teloxide's Dispatcher; the same schema is
/// used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler(deps_commands))
        // Message handler for URLs
        .branch(message_handler(deps_messages))
        // Callback query handler (format-selection buttons)
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /connect_instagram, /history)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => handle_start_command(&bot, &msg, &deps).await?,
                    Command::ConnectInstagram { username } => {
                        handle_connect_instagram_command(&bot, &msg, &deps, &username).await?;
                    }
                    Command::History => handle_history_command(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        },
    ))
}

/// Handler for regular messages (treated as download requests)
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
        .endpoint(move |_bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Some(text) = msg.text() {
                    deps.pipeline.handle_url(msg.chat.id.0, text).await;
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            // Stop the button spinner regardless of the outcome.
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            let requester = i64::try_from(q.from.id.0).unwrap_or(0);
            match q.data.as_deref().and_then(parse_callback_data) {
                Some((token, index)) => deps.pipeline.handle_choice(requester, token, index).await,
                None => log::warn!("Unrecognized callback data from {}: {:?}", requester, q.data),
            }
            Ok(())
        }
    })
}

async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id.0;
    match get_connection(&deps.db_pool) {
        Ok(conn) => {
            if let Err(e) = db::ensure_user(&conn, chat_id) {
                log::error!("Failed to create user {}: {}", chat_id, e);
            }
        }
        Err(e) => log::error!("DB connection error: {}", e),
    }

    bot.send_message(msg.chat.id, WELCOME).await?;
    Ok(())
}

async fn handle_connect_instagram_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    username: &str,
) -> Result<(), HandlerError> {
    let username = username.trim().trim_start_matches('@');
    if username.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /connect_instagram <your instagram username>")
            .await?;
        return Ok(());
    }

    let chat_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    db::link_instagram(&conn, chat_id, username)?;
    drop(conn);

    log::info!("Linked Instagram @{} to chat {}", username, chat_id);
    bot.send_message(
        msg.chat.id,
        format!(
            "✅ Instagram account @{} linked. Share a video with our Instagram bot and it will arrive here.",
            username
        ),
    )
    .await?;
    Ok(())
}

async fn handle_history_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id.0;
    let conn = get_connection(&deps.db_pool)?;
    let urls = db::get_downloads(&conn, chat_id)?;
    drop(conn);

    let text = if urls.is_empty() {
        "No downloads yet. Send me a video link to get started!".to_string()
    } else {
        let recent: Vec<String> = urls
            .iter()
            .rev()
            .take(10)
            .enumerate()
            .map(|(i, url)| format!("{}. {}", i + 1, url))
            .collect();
        format!("📂 Your recent downloads:\n{}", recent.join("\n"))
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
