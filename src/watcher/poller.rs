//! Background poller bridging the inbox to Telegram delivery.
//!
//! Runs as a `tokio::spawn`ed task. Each cycle: fetch unread media shares,
//! resolve each sender to a linked Telegram account, deliver through the
//! pipeline, mark delivered items seen. Unlinked senders are told on the
//! source platform how to link first.

use std::sync::Arc;
use tokio::time::interval;

use crate::core::config;
use crate::download::pipeline::Pipeline;
use crate::storage::db;
use crate::storage::{get_connection, DbPool};

use super::traits::DirectInbox;

const LINK_INSTRUCTIONS: &str =
    "Please connect your Telegram account first: send /connect_instagram <your instagram username> to our Telegram bot.";

/// Start the inbox poller background task.
pub fn start_inbox_poller(
    db_pool: Arc<DbPool>,
    inbox: Arc<dyn DirectInbox>,
    pipeline: Arc<Pipeline>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(config::watcher::poll_interval());
        log::info!(
            "Inbox poller started (interval: {}s)",
            config::watcher::POLL_INTERVAL_SECS
        );

        loop {
            ticker.tick().await;

            // login() is a no-op while the session is healthy and re-auths
            // after it drops; a failed login just skips this cycle.
            if let Err(e) = inbox.login().await {
                log::warn!("Inbox login failed, skipping cycle: {}", e);
                continue;
            }

            if let Err(e) = run_poll_cycle(&db_pool, inbox.as_ref(), &pipeline).await {
                log::warn!("Inbox poll cycle failed: {}", e);
            }
        }
    })
}

/// Run one poll cycle. Per-share failures are logged and the cycle
/// continues; only inbox-level failures abort it.
pub(crate) async fn run_poll_cycle(
    db_pool: &Arc<DbPool>,
    inbox: &dyn DirectInbox,
    pipeline: &Pipeline,
) -> Result<(), String> {
    let shares = inbox.unread_shares().await?;
    if shares.is_empty() {
        return Ok(());
    }
    log::info!("Inbox poll: {} unread media share(s)", shares.len());

    for share in shares {
        // Links are stored by username; fall back to the numeric ID for
        // integrations that linked with it directly.
        let linked = {
            let conn = get_connection(db_pool).map_err(|e| format!("DB connection error: {}", e))?;
            let by_username = match &share.sender_username {
                Some(username) => {
                    db::find_by_instagram_id(&conn, username).map_err(|e| format!("DB lookup error: {}", e))?
                }
                None => None,
            };
            match by_username {
                Some(user) => Some(user),
                None => db::find_by_instagram_id(&conn, &share.sender_id)
                    .map_err(|e| format!("DB lookup error: {}", e))?,
            }
        };

        match linked {
            None => {
                log::info!("Inbox share from unlinked sender {}", share.sender_id);
                if let Err(e) = inbox.send_text(&share.sender_id, LINK_INSTRUCTIONS).await {
                    log::warn!("Failed to instruct sender {}: {}", share.sender_id, e);
                }
            }
            Some(user) => {
                let delivered = pipeline
                    .deliver_direct(user.telegram_id, &share.media_url, &share.title)
                    .await;
                if delivered {
                    if let Err(e) = inbox.mark_seen(&share.thread_id, &share.item_id).await {
                        log::warn!("Failed to mark item {} seen: {}", share.item_id, e);
                    }
                } else {
                    // Left unread; the next cycle retries.
                    log::warn!(
                        "Delivery to chat {} failed for item {}",
                        user.telegram_id,
                        share.item_id
                    );
                }
            }
        }
    }

    Ok(())
}
