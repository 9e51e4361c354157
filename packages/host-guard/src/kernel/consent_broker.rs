//! Consent Broker - the interactive consent dialog as a message exchange
//!
//! `authorize` calls park here until the UI answers. Each waiting call owns a
//! oneshot receiver; the UI sees the queue through `list_pending`/`subscribe`
//! and answers with `respond` or `dismiss`. No store lock is held while a
//! caller waits, and only that caller waits.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::SharedClock;
use crate::domains::channels::{ConsentDecision, ConsentRequest};
use crate::kernel::BaseConsentPrompt;

const NOTIFICATION_CAPACITY: usize = 64;

/// A prompt waiting for the user, as shown to the UI
#[derive(Debug, Clone, Serialize)]
pub struct PendingConsent {
    pub id: Uuid,
    #[serde(flatten)]
    pub request: ConsentRequest,
    pub created_at: DateTime<Utc>,
}

struct PendingPrompt {
    info: PendingConsent,
    response_tx: oneshot::Sender<ConsentDecision>,
}

/// Queue of consent prompts awaiting a user decision
pub struct ConsentBroker {
    pending: Arc<RwLock<HashMap<Uuid, PendingPrompt>>>,
    notifications: broadcast::Sender<PendingConsent>,
    timeout: Option<Duration>,
    clock: SharedClock,
}

impl ConsentBroker {
    /// `timeout` bounds how long a prompt may stay unanswered; once it
    /// elapses the prompt counts as denied.
    pub fn new(timeout: Option<Duration>, clock: SharedClock) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
            notifications,
            timeout,
            clock,
        }
    }

    /// Answer a pending prompt
    pub async fn respond(&self, id: Uuid, decision: ConsentDecision) -> Result<()> {
        let prompt = self.pending.write().await.remove(&id);

        let Some(prompt) = prompt else {
            anyhow::bail!("Consent request {} not found or already answered", id);
        };

        if prompt.response_tx.send(decision).is_err() {
            anyhow::bail!("Consent request {} is no longer awaited", id);
        }

        info!(
            request_id = %id,
            channel = %prompt.info.request.channel,
            decision = ?decision,
            "Consent answered"
        );
        Ok(())
    }

    /// Close a prompt without a choice. The waiting caller is denied.
    pub async fn dismiss(&self, id: Uuid) -> Result<()> {
        match self.pending.write().await.remove(&id) {
            // Dropping the sender resolves the waiter as Deny
            Some(prompt) => {
                info!(request_id = %id, channel = %prompt.info.request.channel, "Consent dismissed");
                Ok(())
            }
            None => anyhow::bail!("Consent request {} not found or already answered", id),
        }
    }

    /// Prompts still awaiting an answer, oldest first
    pub async fn list_pending(&self) -> Vec<PendingConsent> {
        let mut pending = self.pending.write().await;
        // Callers that went away (cancelled request) no longer need an answer
        pending.retain(|_, prompt| !prompt.response_tx.is_closed());

        let mut infos: Vec<PendingConsent> =
            pending.values().map(|prompt| prompt.info.clone()).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Stream of newly queued prompts for a UI to render
    pub fn subscribe(&self) -> broadcast::Receiver<PendingConsent> {
        self.notifications.subscribe()
    }

    async fn wait_for_answer(
        &self,
        id: Uuid,
        rx: oneshot::Receiver<ConsentDecision>,
    ) -> ConsentDecision {
        let answer = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(answer) => answer,
                Err(_) => {
                    self.pending.write().await.remove(&id);
                    warn!(request_id = %id, timeout_secs = limit.as_secs(), "Consent prompt timed out");
                    return ConsentDecision::Deny;
                }
            },
            None => rx.await,
        };

        answer.unwrap_or_else(|_| {
            debug!(request_id = %id, "Consent prompt closed without a choice");
            ConsentDecision::Deny
        })
    }
}

#[async_trait]
impl BaseConsentPrompt for ConsentBroker {
    async fn prompt_user(&self, request: ConsentRequest) -> ConsentDecision {
        let id = Uuid::new_v4();
        let (response_tx, rx) = oneshot::channel();
        let info = PendingConsent {
            id,
            request,
            created_at: self.clock.now(),
        };

        {
            let mut pending = self.pending.write().await;
            pending.insert(
                id,
                PendingPrompt {
                    info: info.clone(),
                    response_tx,
                },
            );
        }

        info!(
            request_id = %id,
            channel = %info.request.channel,
            requester = %info.request.requester,
            "Consent requested"
        );
        // No subscribers is fine; the UI can poll list_pending instead
        let _ = self.notifications.send(info);

        self.wait_for_answer(id, rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SystemClock;

    fn broker(timeout: Option<Duration>) -> Arc<ConsentBroker> {
        Arc::new(ConsentBroker::new(timeout, Arc::new(SystemClock)))
    }

    fn request(operation: &str) -> ConsentRequest {
        ConsentRequest {
            channel: "plugin:start".to_string(),
            operation: operation.to_string(),
            requester: "main-window".to_string(),
        }
    }

    #[tokio::test]
    async fn test_respond_resolves_waiter() {
        let broker = broker(None);
        let mut notifications = broker.subscribe();

        let waiter = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.prompt_user(request("Start plugin X")).await })
        };

        let queued = notifications.recv().await.unwrap();
        assert_eq!(queued.request.operation, "Start plugin X");
        assert_eq!(broker.list_pending().await.len(), 1);

        broker
            .respond(queued.id, ConsentDecision::AlwaysAllow)
            .await
            .unwrap();

        assert_eq!(waiter.await.unwrap(), ConsentDecision::AlwaysAllow);
        assert!(broker.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_dismiss_is_deny() {
        let broker = broker(None);
        let mut notifications = broker.subscribe();

        let waiter = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.prompt_user(request("Open a file")).await })
        };

        let queued = notifications.recv().await.unwrap();
        broker.dismiss(queued.id).await.unwrap();

        assert_eq!(waiter.await.unwrap(), ConsentDecision::Deny);
    }

    #[tokio::test]
    async fn test_timeout_is_deny() {
        let broker = broker(Some(Duration::from_millis(20)));

        let decision = broker.prompt_user(request("Slow user")).await;

        assert_eq!(decision, ConsentDecision::Deny);
        assert!(broker.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_error() {
        let broker = broker(None);
        assert!(broker
            .respond(Uuid::new_v4(), ConsentDecision::AllowOnce)
            .await
            .is_err());
        assert!(broker.dismiss(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_waiting_prompt_does_not_block_others() {
        let broker = broker(None);
        let mut notifications = broker.subscribe();

        let slow = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.prompt_user(request("First")).await })
        };
        let fast = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.prompt_user(request("Second")).await })
        };

        let a = notifications.recv().await.unwrap();
        let b = notifications.recv().await.unwrap();
        let (first, second) = if a.request.operation == "First" {
            (a, b)
        } else {
            (b, a)
        };

        broker
            .respond(second.id, ConsentDecision::AllowOnce)
            .await
            .unwrap();
        assert_eq!(fast.await.unwrap(), ConsentDecision::AllowOnce);
        assert!(!slow.is_finished());

        broker.respond(first.id, ConsentDecision::Deny).await.unwrap();
        assert_eq!(slow.await.unwrap(), ConsentDecision::Deny);
    }

    #[tokio::test]
    async fn test_cancelled_caller_leaves_queue() {
        let broker = broker(None);
        let mut notifications = broker.subscribe();

        let waiter = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.prompt_user(request("Abandoned")).await })
        };
        let queued = notifications.recv().await.unwrap();

        waiter.abort();
        let _ = waiter.await;

        assert!(broker.list_pending().await.is_empty());
        assert!(broker
            .respond(queued.id, ConsentDecision::AllowOnce)
            .await
            .is_err());
    }
}
