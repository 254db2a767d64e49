//! Pending-choice registry: scoped, single-use tokens for the format dialog.
//!
//! A single dispatcher resolves tokens to pending negotiation state instead
//! of registering a listener per presented button. Tokens are scoped to the
//! requester who received the menu, consumed exactly once, invalidated when
//! a newer request from the same requester supersedes them, and expire
//! after a TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

use crate::core::config;
use crate::core::platform::Platform;

use super::error::DownloadError;
use super::rendition::Rendition;

/// What the requester is being asked, with everything needed to resume the
/// negotiation when the answer arrives.
#[derive(Debug, Clone)]
pub enum ChoiceStage {
    /// Audio-only vs video+audio.
    MediaType {
        platform: Platform,
        url: Url,
        title: String,
        renditions: Vec<Rendition>,
    },
    /// Indexed quality list (already deduplicated and sorted).
    Quality {
        platform: Platform,
        url: Url,
        title: String,
        candidates: Vec<Rendition>,
        best_audio: Option<Rendition>,
    },
}

/// A live menu awaiting its single answer.
#[derive(Debug)]
pub struct PendingChoice {
    pub token: Uuid,
    pub requester: i64,
    pub stage: ChoiceStage,
    issued_at: Instant,
}

impl PendingChoice {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.issued_at.elapsed() > ttl
    }
}

#[derive(Default)]
struct Inner {
    by_token: HashMap<Uuid, PendingChoice>,
    by_requester: HashMap<i64, Uuid>,
}

/// Mutex-guarded token table. Insert, invalidate and consume race against
/// each other when a requester answers a menu while firing a new request.
#[derive(Default)]
pub struct ChoiceRegistry {
    inner: Mutex<Inner>,
}

impl ChoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token; any earlier live token for the same requester is
    /// invalidated so a late answer to the old menu cannot mis-route.
    pub fn issue(&self, requester: i64, stage: ChoiceStage) -> Uuid {
        let token = Uuid::new_v4();
        let mut inner = self.lock();

        if let Some(old) = inner.by_requester.insert(requester, token) {
            inner.by_token.remove(&old);
        }
        Self::prune_expired(&mut inner);

        inner.by_token.insert(
            token,
            PendingChoice {
                token,
                requester,
                stage,
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// Consume a token exactly once.
    ///
    /// Unknown token, wrong requester, or expiry all yield `StaleChoice`.
    /// A wrong-requester answer has no side effect: the owner can still
    /// answer their own menu afterwards.
    pub fn consume(&self, requester: i64, token: Uuid) -> Result<PendingChoice, DownloadError> {
        let mut inner = self.lock();

        let owner = match inner.by_token.get(&token) {
            Some(pending) => pending.requester,
            None => return Err(DownloadError::StaleChoice),
        };
        if owner != requester {
            return Err(DownloadError::StaleChoice);
        }

        let Some(pending) = inner.by_token.remove(&token) else {
            return Err(DownloadError::StaleChoice);
        };
        if inner.by_requester.get(&requester) == Some(&token) {
            inner.by_requester.remove(&requester);
        }

        if pending.is_expired(config::choice::ttl()) {
            return Err(DownloadError::StaleChoice);
        }
        Ok(pending)
    }

    /// Drop any live token for the requester (a new request supersedes).
    pub fn invalidate_for(&self, requester: i64) {
        let mut inner = self.lock();
        if let Some(token) = inner.by_requester.remove(&requester) {
            inner.by_token.remove(&token);
        }
    }

    fn prune_expired(inner: &mut Inner) {
        let ttl = config::choice::ttl();
        inner.by_token.retain(|_, pending| !pending.is_expired(ttl));
        let dangling: Vec<i64> = inner
            .by_requester
            .iter()
            .filter(|(_, token)| !inner.by_token.contains_key(token))
            .map(|(requester, _)| *requester)
            .collect();
        for requester in dangling {
            inner.by_requester.remove(&requester);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Test hook: rewind a token's issue time to simulate expiry.
    #[cfg(test)]
    fn backdate(&self, token: Uuid, age: Duration) {
        let mut inner = self.lock();
        if let Some(pending) = inner.by_token.get_mut(&token) {
            if let Some(past) = Instant::now().checked_sub(age) {
                pending.issued_at = past;
            }
        }
    }
}
