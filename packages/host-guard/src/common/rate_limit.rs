//! Fixed-window request counter keyed by identifier hash.
//!
//! Backs the OTP engine's per-email budget. The HTTP layer additionally runs
//! `tower_governor` per client IP; that layer is coarse abuse protection and
//! is not what enforces the OTP budget.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::clock::SharedClock;

/// Counter state for one identifier hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.window_reset_at
    }
}

/// Outcome of a [`RateLimiter::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Blocked {
        reset_at: DateTime<Utc>,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        match self {
            RateLimitDecision::Allowed { reset_at, .. } | RateLimitDecision::Blocked { reset_at } => {
                *reset_at
            }
        }
    }
}

/// In-memory rate limiter
///
/// Keys must already be hashed; the limiter never sees raw identifiers.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    window: Duration,
    max_requests: u32,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, clock: SharedClock) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
            clock,
        }
    }

    /// Count one request against `key` and report whether it may proceed.
    ///
    /// A blocked request does not increment the counter, so a client that
    /// keeps hammering cannot push its own reset time further out.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        match entries.get_mut(key) {
            Some(entry) if !entry.is_elapsed(now) => {
                if entry.count >= self.max_requests {
                    return RateLimitDecision::Blocked {
                        reset_at: entry.window_reset_at,
                    };
                }
                entry.count += 1;
                RateLimitDecision::Allowed {
                    remaining: self.max_requests - entry.count,
                    reset_at: entry.window_reset_at,
                }
            }
            _ => {
                let entry = RateLimitEntry {
                    count: 1,
                    window_reset_at: now + self.window,
                };
                let decision = RateLimitDecision::Allowed {
                    remaining: self.max_requests.saturating_sub(1),
                    reset_at: entry.window_reset_at,
                };
                entries.insert(key.to_string(), entry);
                decision
            }
        }
    }

    /// Drop entries whose window has elapsed. Returns how many were removed.
    ///
    /// Housekeeping only: `check` replaces stale entries on access anyway.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_elapsed(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Swept expired rate-limit entries");
        }
        removed
    }

    /// Current entry for a key, if any
    pub async fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
