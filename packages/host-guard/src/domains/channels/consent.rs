use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The user's answer to a consent prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentDecision {
    AllowOnce,
    Deny,
    AlwaysAllow,
}

/// What the UI is asked to confirm
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentRequest {
    pub channel: String,
    /// Human-readable operation, e.g. "Start plugin weather"
    pub operation: String,
    /// Who asked (window, session or client address)
    pub requester: String,
}

/// `"<channel>:<operation label>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsentKey(String);

impl ConsentKey {
    pub fn new(channel: &str, operation: &str) -> Self {
        Self(format!("{}:{}", channel, operation))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session used when the caller did not present one (in-process host code)
pub const LOCAL_SESSION: &str = "local";

/// "Always allow" grants, one set per session
///
/// Lives only in memory. A grant made in one session is never consulted
/// for another; ending a session or a restart revokes its grants.
#[derive(Clone, Default)]
pub struct ConsentStore {
    grants: Arc<RwLock<HashMap<String, HashSet<ConsentKey>>>>,
}

impl ConsentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, session: &str, key: &ConsentKey) -> bool {
        self.grants
            .read()
            .await
            .get(session)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Record a grant for `session`. Returns false if it was already present.
    pub async fn grant(&self, session: &str, key: ConsentKey) -> bool {
        self.grants
            .write()
            .await
            .entry(session.to_string())
            .or_default()
            .insert(key)
    }

    /// Revoke one session's grants, returning how many were dropped
    pub async fn clear_session(&self, session: &str) -> usize {
        self.grants
            .write()
            .await
            .remove(session)
            .map_or(0, |keys| keys.len())
    }

    /// Revoke every grant in every session
    pub async fn clear(&self) -> usize {
        let mut grants = self.grants.write().await;
        let count = grants.values().map(HashSet::len).sum();
        grants.clear();
        count
    }

    /// Grants across all sessions
    pub async fn len(&self) -> usize {
        self.grants.read().await.values().map(HashSet::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_key_format() {
        let key = ConsentKey::new("plugin:start", "Start plugin weather");
        assert_eq!(key.as_str(), "plugin:start:Start plugin weather");
    }

    #[tokio::test]
    async fn test_grant_and_clear() {
        let store = ConsentStore::new();
        let key = ConsentKey::new("fs:read-file", "Read notes");

        assert!(!store.contains(LOCAL_SESSION, &key).await);
        assert!(store.grant(LOCAL_SESSION, key.clone()).await);
        assert!(!store.grant(LOCAL_SESSION, key.clone()).await);
        assert!(store.contains(LOCAL_SESSION, &key).await);

        assert_eq!(store.clear().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_labels_are_distinct_grants() {
        let store = ConsentStore::new();
        store
            .grant(LOCAL_SESSION, ConsentKey::new("plugin:start", "Start plugin X"))
            .await;

        assert!(
            !store
                .contains(LOCAL_SESSION, &ConsentKey::new("plugin:start", "Start plugin Y"))
                .await
        );
    }

    #[tokio::test]
    async fn test_grants_do_not_cross_sessions() {
        let store = ConsentStore::new();
        let key = ConsentKey::new("shell:open-external", "Open example.org");

        store.grant("session-a", key.clone()).await;

        assert!(store.contains("session-a", &key).await);
        assert!(!store.contains("session-b", &key).await);
        assert!(!store.contains(LOCAL_SESSION, &key).await);
    }

    #[tokio::test]
    async fn test_clear_session_leaves_others() {
        let store = ConsentStore::new();
        let key = ConsentKey::new("plugin:start", "Start plugin weather");
        store.grant("session-a", key.clone()).await;
        store.grant("session-b", key.clone()).await;

        assert_eq!(store.clear_session("session-a").await, 1);
        assert_eq!(store.clear_session("session-a").await, 0);

        assert!(!store.contains("session-a", &key).await);
        assert!(store.contains("session-b", &key).await);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_decision_serde() {
        let decision: ConsentDecision = serde_json::from_str("\"always_allow\"").unwrap();
        assert_eq!(decision, ConsentDecision::AlwaysAllow);
        assert_eq!(
            serde_json::to_string(&ConsentDecision::AllowOnce).unwrap(),
            "\"allow_once\""
        );
    }
}
