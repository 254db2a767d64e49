//! Instagram private-API inbox client.
//!
//! Speaks the mobile endpoints under `i.instagram.com/api/v1` with a
//! cookie-holding HTTP client. Auth state lives in the cookie store; the
//! `logged_in` flag only tracks whether login succeeded this session.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::config;

use super::traits::{DirectInbox, InboxShare};

const API_BASE: &str = "https://i.instagram.com/api/v1";
const MOBILE_USER_AGENT: &str = "Instagram 219.0.0.12.117 Android (30/11; 420dpi; 1080x2137; samsung; SM-G973F; beyond1; exynos9820; en_US)";

pub struct InstagramInbox {
    client: reqwest::Client,
    username: String,
    password: String,
    logged_in: AtomicBool,
}

impl InstagramInbox {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config::network::connect_timeout())
            .user_agent(MOBILE_USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client for Instagram: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            username: username.into(),
            password: password.into(),
            logged_in: AtomicBool::new(false),
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(format!("{}{}", API_BASE, path))
            .send()
            .await
            .map_err(|e| format!("GET {} failed: {}", path, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            self.logged_in.store(false, Ordering::SeqCst);
            return Err(format!("GET {} unauthorized ({})", path, status));
        }
        if !status.is_success() {
            return Err(format!("GET {} returned {}", path, status));
        }

        response.json().await.map_err(|e| format!("GET {}: bad JSON: {}", path, e))
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value, String> {
        let response = self
            .client
            .post(format!("{}{}", API_BASE, path))
            .form(form)
            .send()
            .await
            .map_err(|e| format!("POST {} failed: {}", path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("POST {} returned {}", path, status));
        }

        response.json().await.map_err(|e| format!("POST {}: bad JSON: {}", path, e))
    }
}

#[async_trait]
impl DirectInbox for InstagramInbox {
    async fn login(&self) -> Result<(), String> {
        if self.logged_in.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Warm up the cookie jar (csrftoken) before authenticating.
        let _ = self
            .client
            .get("https://www.instagram.com/")
            .send()
            .await
            .map_err(|e| format!("pre-login request failed: {}", e))?;

        let device_id = format!("android-{:x}", device_seed(&self.username));
        let json = self
            .post_form(
                "/accounts/login/",
                &[
                    ("username", self.username.as_str()),
                    ("password", self.password.as_str()),
                    ("device_id", device_id.as_str()),
                    ("login_attempt_count", "0"),
                ],
            )
            .await?;

        if json.get("status").and_then(|v| v.as_str()) == Some("ok") {
            self.logged_in.store(true, Ordering::SeqCst);
            log::info!("Instagram login successful for @{}", self.username);
            Ok(())
        } else {
            let message = json
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("login rejected");
            Err(format!("Instagram login failed: {}", message))
        }
    }

    async fn unread_shares(&self) -> Result<Vec<InboxShare>, String> {
        let json = self.get_json("/direct_v2/inbox/").await?;
        Ok(shares_from_inbox_json(&json))
    }

    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), String> {
        let recipients = format!("[[{}]]", user_id);
        self.post_form(
            "/direct_v2/threads/broadcast/text/",
            &[("recipient_users", recipients.as_str()), ("text", text)],
        )
        .await
        .map(drop)
    }

    async fn mark_seen(&self, thread_id: &str, item_id: &str) -> Result<(), String> {
        self.post_form(
            &format!("/direct_v2/threads/{}/items/{}/seen/", thread_id, item_id),
            &[],
        )
        .await
        .map(drop)
    }
}

/// Extract unread media shares from an inbox response.
///
/// An item qualifies when it has no `seen_at` timestamp and carries a
/// `media_share` with at least one video version.
fn shares_from_inbox_json(json: &Value) -> Vec<InboxShare> {
    let threads = json
        .pointer("/inbox/threads")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut shares = Vec::new();
    for thread in threads {
        let thread_id = match thread.get("thread_id").and_then(thread_or_item_id) {
            Some(id) => id,
            None => continue,
        };
        let usernames = thread_usernames(thread);
        let items = thread.get("items").and_then(|v| v.as_array()).map(Vec::as_slice).unwrap_or_default();

        for item in items {
            if item.get("seen_at").is_some_and(|v| !v.is_null()) {
                continue;
            }
            let media_share = match item.get("media_share") {
                Some(share) => share,
                None => continue,
            };
            let media_url = match media_share
                .pointer("/video_versions/0/url")
                .and_then(|v| v.as_str())
            {
                Some(url) => url.to_string(),
                None => continue,
            };

            let item_id = match item.get("item_id").and_then(thread_or_item_id) {
                Some(id) => id,
                None => continue,
            };
            let sender_id = match item.get("user_id").and_then(thread_or_item_id) {
                Some(id) => id,
                None => continue,
            };
            let title = media_share
                .pointer("/caption/text")
                .and_then(|v| v.as_str())
                .unwrap_or("Here's your Instagram video!")
                .to_string();

            let sender_username = usernames
                .iter()
                .find(|(pk, _)| *pk == sender_id)
                .map(|(_, username)| username.clone());

            shares.push(InboxShare {
                sender_id,
                sender_username,
                media_url,
                title,
                thread_id: thread_id.clone(),
                item_id,
            });
        }
    }
    shares
}

/// Map of participant pk → username from thread metadata.
fn thread_usernames(thread: &Value) -> Vec<(String, String)> {
    thread
        .get("users")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|user| {
            let pk = user.get("pk").and_then(thread_or_item_id)?;
            let username = user.get("username").and_then(|v| v.as_str())?;
            Some((pk, username.to_string()))
        })
        .collect()
}

/// Instagram serializes IDs as either strings or numbers depending on the
/// endpoint version.
fn thread_or_item_id(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
        .or_else(|| value.as_u64().map(|n| n.to_string()))
}

/// Stable short hash for device-id derivation. Not cryptographic.
fn device_seed(input: &str) -> u64 {
    input.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
