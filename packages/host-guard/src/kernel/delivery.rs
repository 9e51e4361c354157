//! OTP delivery outbox
//!
//! The engine hands codes to [`OutboxDelivery`], which queues them for
//! whatever mailer the host attaches to the receiving end.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

use crate::kernel::BaseOtpDelivery;

/// A code addressed to one identifier
#[derive(Clone)]
pub struct OtpMessage {
    pub to: String,
    pub code: String,
}

impl fmt::Debug for OtpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpMessage")
            .field("to", &"[email]")
            .field("code", &"******")
            .finish()
    }
}

/// Bounded queue in front of the host's mailer
#[derive(Clone)]
pub struct OutboxDelivery {
    tx: mpsc::Sender<OtpMessage>,
}

impl OutboxDelivery {
    /// Create an outbox and the receiver the mailer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OtpMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl BaseOtpDelivery for OutboxDelivery {
    async fn deliver(&self, identifier: &str, code: &str) -> Result<()> {
        self.tx
            .send(OtpMessage {
                to: identifier.to_string(),
                code: code.to_string(),
            })
            .await
            .map_err(|_| anyhow!("OTP outbox is closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivers_to_receiver() {
        let (outbox, mut rx) = OutboxDelivery::channel(4);

        outbox.deliver("a@example.com", "123456").await.unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.to, "a@example.com");
        assert_eq!(message.code, "123456");
    }

    #[tokio::test]
    async fn test_closed_outbox_fails() {
        let (outbox, rx) = OutboxDelivery::channel(1);
        drop(rx);

        assert!(outbox.deliver("a@example.com", "123456").await.is_err());
    }

    #[test]
    fn test_debug_hides_contents() {
        let message = OtpMessage {
            to: "a@example.com".to_string(),
            code: "123456".to_string(),
        };
        let rendered = format!("{:?}", message);
        assert!(!rendered.contains("123456"));
        assert!(!rendered.contains("a@example.com"));
    }
}
