use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domains::auth::code::{HASH_LEN, SALT_LEN};
use crate::domains::auth::errors::OtpError;

/// One outstanding passcode, stored only as a salted hash
#[derive(Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// Distinguishes this issue from later ones for the same identifier
    pub id: Uuid,
    pub hash: [u8; HASH_LEN],
    pub salt: [u8; SALT_LEN],
    pub expires_at: DateTime<Utc>,
    pub attempts_remaining: u32,
}

impl fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRecord")
            .field("id", &self.id)
            .field("expires_at", &self.expires_at)
            .field("attempts_remaining", &self.attempts_remaining)
            .finish_non_exhaustive()
    }
}

/// An attempt already charged against a record, carrying what is needed to
/// check the supplied code outside the store lock
#[derive(Clone)]
pub struct AttemptTicket {
    pub record_id: Uuid,
    pub hash: [u8; HASH_LEN],
    pub salt: [u8; SALT_LEN],
    pub attempts_remaining: u32,
}

/// In-memory OTP records keyed by identifier hash
///
/// At most one record per key; issuing replaces.
#[derive(Clone, Default)]
pub struct OtpStore {
    records: Arc<Mutex<HashMap<String, OtpRecord>>>,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `record` as the live one for `key`, returning the one it replaced
    pub async fn replace(&self, key: &str, record: OtpRecord) -> Option<OtpRecord> {
        self.records.lock().await.insert(key.to_string(), record)
    }

    /// Check expiry and budget, then charge one attempt.
    ///
    /// Charging up front means concurrent guesses against the same record
    /// can never exceed the budget, however long hashing takes.
    pub async fn begin_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptTicket, OtpError> {
        let mut records = self.records.lock().await;

        let Some(record) = records.get_mut(key) else {
            return Err(OtpError::NoActiveOtp);
        };

        if now > record.expires_at {
            records.remove(key);
            return Err(OtpError::Expired);
        }

        if record.attempts_remaining == 0 {
            return Err(OtpError::AttemptsExhausted);
        }

        record.attempts_remaining -= 1;
        Ok(AttemptTicket {
            record_id: record.id,
            hash: record.hash,
            salt: record.salt,
            attempts_remaining: record.attempts_remaining,
        })
    }

    /// Remove the record for `key` only if it is still the one with `record_id`.
    pub async fn remove_if_current(&self, key: &str, record_id: Uuid) -> bool {
        let mut records = self.records.lock().await;
        match records.get(key) {
            Some(record) if record.id == record_id => {
                records.remove(key);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, key: &str) -> Option<OtpRecord> {
        self.records.lock().await.get(key).cloned()
    }

    /// Drop records that can no longer be verified. Returns how many.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| now <= record.expires_at);
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}
