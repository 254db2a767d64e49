use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::process::Command as TokioCommand;

use clipferry::cli::{Cli, Commands};
use clipferry::core::{config, init_logger, web_server};
use clipferry::download::extract::YtDlpExtractor;
use clipferry::download::fetch::HttpFetcher;
use clipferry::download::merge::FfmpegMerger;
use clipferry::download::pipeline::Pipeline;
use clipferry::storage::create_pool;
use clipferry::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramChannel};
use clipferry::watcher::{start_inbox_poller, InstagramInbox};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Tools) => run_tools().await,
        Some(Commands::Run) | None => run_bot().await,
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting clipferry...");

    // Database connection pool
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    // Bot instance
    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    // Download pipeline with production collaborators
    let channel = Arc::new(TelegramChannel::new(bot.clone()));
    let pipeline = Arc::new(Pipeline::new(
        channel,
        Arc::new(YtDlpExtractor::new()),
        Arc::new(HttpFetcher::new()),
        Arc::new(FfmpegMerger::new()),
        Arc::clone(&db_pool),
    ));

    // Public HTTP surface (health check + relay stub)
    let web_port = *config::WEB_PORT;
    tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(web_port).await {
            log::error!("Web server exited: {}", e);
        }
    });

    // Instagram inbox bridge
    match (config::INSTAGRAM_USERNAME.clone(), config::INSTAGRAM_PASSWORD.clone()) {
        (Some(username), Some(password)) => {
            let inbox = Arc::new(InstagramInbox::new(username, password));
            start_inbox_poller(Arc::clone(&db_pool), inbox, Arc::clone(&pipeline));
        }
        _ => log::warn!("INSTAGRAM_USERNAME/INSTAGRAM_PASSWORD not set - inbox bridge disabled"),
    }

    let deps = HandlerDeps { db_pool, pipeline };

    log::info!("Bot dispatcher starting");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Print the versions of the external tools the bot shells out to.
async fn run_tools() -> Result<()> {
    for (name, bin, flag) in [
        ("yt-dlp", config::YTDL_BIN.as_str(), "--version"),
        ("ffmpeg", config::FFMPEG_BIN.as_str(), "-version"),
    ] {
        match TokioCommand::new(bin).arg(flag).output().await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let version = stdout.lines().next().unwrap_or("unknown");
                println!("{}: {}", name, version);
            }
            Ok(output) => {
                println!("{}: {} exited with {:?}", name, bin, output.status.code());
            }
            Err(e) => {
                println!("{}: {} not available ({})", name, bin, e);
            }
        }
    }
    Ok(())
}
