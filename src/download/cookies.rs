//! Process-wide cookie context for extractor requests.
//!
//! Best-effort: a single-slot pool holding the cookie header scraped from
//! the YouTube front page, handed to yt-dlp as a request header. Refreshed
//! lazily when empty and invalidated on demand.

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::core::config;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static GLOBAL_POOL: Lazy<CookiePool> = Lazy::new(CookiePool::new);

/// Single-slot rotating cookie pool shared by all extractions.
pub struct CookiePool {
    slot: Mutex<Option<String>>,
}

impl CookiePool {
    fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    pub fn global() -> &'static CookiePool {
        &GLOBAL_POOL
    }

    /// Current cookie header, fetching one if the slot is empty.
    /// Returns `None` when no cookie could be obtained; extraction proceeds
    /// without one.
    pub async fn current(&self) -> Option<String> {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            *slot = fetch_front_page_cookies().await;
        }
        slot.clone()
    }

    /// Drop the stored cookie so the next request fetches a fresh one.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }
}

/// Collect `Set-Cookie` headers from the YouTube front page into a single
/// `Cookie:` header value.
async fn fetch_front_page_cookies() -> Option<String> {
    let client = reqwest::Client::builder()
        .connect_timeout(config::network::connect_timeout())
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .ok()?;

    let response = match client.get("https://www.youtube.com").send().await {
        Ok(r) => r,
        Err(e) => {
            log::debug!("Cookie refresh failed: {}", e);
            return None;
        }
    };

    let header = join_set_cookie_values(
        response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    );

    if header.is_empty() {
        log::debug!("Cookie refresh returned no Set-Cookie headers");
        None
    } else {
        log::debug!("Cookie pool refreshed ({} bytes)", header.len());
        Some(header)
    }
}

/// Keep only the `name=value` part of each Set-Cookie header.
fn join_set_cookie_values<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
