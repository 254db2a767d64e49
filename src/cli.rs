use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clipferry")]
#[command(author, version, about = "Telegram bot that downloads and relays videos from YouTube, Facebook, TikTok and LinkedIn", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service
    Run,

    /// Print the yt-dlp and ffmpeg versions this binary will use
    Tools,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
