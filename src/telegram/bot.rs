//! Bot initialization and command definitions.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::core::error::AppError;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "What I can do:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "link your Instagram account: /connect_instagram <username>")]
    ConnectInstagram { username: String },
    #[command(description = "show your download history")]
    History,
}

/// Creates a Bot instance from the configured token.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(AppError)` - Missing token or HTTP client construction failure
pub fn create_bot() -> Result<Bot, AppError> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(AppError::Config(
            "BOT_TOKEN (or TELOXIDE_TOKEN) environment variable not set".into(),
        ));
    }

    let client = ClientBuilder::new()
        .connect_timeout(config::network::connect_timeout())
        .build()?;

    Ok(Bot::with_client(token, client))
}

/// Sets up bot commands in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
