//! OTP issue and verification

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::{RateLimitDecision, RateLimiter, SharedClock};
use crate::config::{ConfigError, SecurityConfig};
use crate::domains::auth::code::{generate_salt, is_well_formed, OtpCode, OtpHasher};
use crate::domains::auth::errors::OtpError;
use crate::domains::auth::models::{NormalizedIdentifier, OtpRecord, OtpStore};
use crate::kernel::BaseOtpDelivery;

/// Opaque success signal from [`OtpEngine::request_otp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSent;

/// Successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// SHA256 of the normalized identifier, usable as a stable subject
    pub identifier_hash: String,
}

/// What a housekeeping sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub rate_limit_entries: usize,
    pub otp_records: usize,
}

/// Email OTP engine
///
/// Owns the rate-limit table and the OTP table. Both are keyed by the
/// identifier hash; raw addresses are only ever passed to the delivery
/// collaborator.
pub struct OtpEngine {
    config: SecurityConfig,
    limiter: RateLimiter,
    store: OtpStore,
    hasher: OtpHasher,
    delivery: Arc<dyn BaseOtpDelivery>,
    clock: SharedClock,
}

impl OtpEngine {
    /// Fails if `config` does not pass [`SecurityConfig::validate`]
    pub fn new(
        config: SecurityConfig,
        delivery: Arc<dyn BaseOtpDelivery>,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let limiter = RateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max_requests,
            clock.clone(),
        );
        let hasher = OtpHasher::new(config.hash_cost);

        Ok(Self {
            config,
            limiter,
            store: OtpStore::new(),
            hasher,
            delivery,
            clock,
        })
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn store(&self) -> &OtpStore {
        &self.store
    }

    /// Issue a fresh code for `identifier` and hand it to the delivery
    /// collaborator, replacing any outstanding code.
    pub async fn request_otp(&self, identifier: &str) -> Result<OtpSent, OtpError> {
        let identifier = NormalizedIdentifier::parse(identifier)?;
        let identifier_hash = identifier.hash();

        if let RateLimitDecision::Blocked { reset_at } = self.limiter.check(&identifier_hash).await
        {
            warn!(
                identifier_hash = %identifier_hash,
                reset_at = %reset_at,
                "OTP request rate limited"
            );
            return Err(OtpError::RateLimited { reset_at });
        }

        let code = OtpCode::generate(self.config.otp_length);
        let salt = generate_salt();
        let hash = self
            .hasher
            .hash_blocking(code.expose().to_string(), salt)
            .await
            .map_err(OtpError::IssueFailed)?;

        let record = OtpRecord {
            id: Uuid::new_v4(),
            hash,
            salt,
            expires_at: self.clock.now() + self.config.otp_expiry,
            attempts_remaining: self.config.otp_max_attempts,
        };
        let record_id = record.id;

        if self.store.replace(&identifier_hash, record).await.is_some() {
            debug!(identifier_hash = %identifier_hash, "Replaced outstanding OTP");
        }

        if let Err(e) = self
            .delivery
            .deliver(identifier.as_str(), code.expose())
            .await
        {
            self.store.remove_if_current(&identifier_hash, record_id).await;
            warn!(
                identifier_hash = %identifier_hash,
                error = %crate::common::sanitize_error(&e.to_string()),
                "OTP delivery failed, record withdrawn"
            );
            return Err(OtpError::IssueFailed("delivery failed".to_string()));
        }

        info!(identifier_hash = %identifier_hash, "OTP issued");
        Ok(OtpSent)
    }

    /// Check `supplied_code` against the outstanding code for `identifier`.
    pub async fn verify_otp(
        &self,
        identifier: &str,
        supplied_code: &str,
    ) -> Result<Verified, OtpError> {
        let identifier = NormalizedIdentifier::parse(identifier)?;
        let identifier_hash = identifier.hash();

        let result = self.check_code(&identifier_hash, supplied_code).await;
        match &result {
            Ok(_) => info!(identifier_hash = %identifier_hash, "OTP verified"),
            Err(e) => warn!(
                identifier_hash = %identifier_hash,
                reason = e.kind(),
                "OTP verification failed"
            ),
        }
        result.map(|_| Verified { identifier_hash })
    }

    async fn check_code(&self, identifier_hash: &str, supplied_code: &str) -> Result<(), OtpError> {
        let ticket = self
            .store
            .begin_attempt(identifier_hash, self.clock.now())
            .await?;

        // Issued codes are always exactly this shape; anything else is a miss
        // and not worth an Argon2 pass.
        if !is_well_formed(supplied_code, self.config.otp_length) {
            return Err(OtpError::Mismatch {
                attempts_remaining: ticket.attempts_remaining,
            });
        }

        let supplied_hash = self
            .hasher
            .hash_blocking(supplied_code.to_string(), ticket.salt)
            .await
            .map_err(OtpError::Hashing)?;

        if !OtpHasher::digests_match(&ticket.hash, &supplied_hash) {
            return Err(OtpError::Mismatch {
                attempts_remaining: ticket.attempts_remaining,
            });
        }

        // A request_otp that landed while we were hashing invalidates this match
        if !self
            .store
            .remove_if_current(identifier_hash, ticket.record_id)
            .await
        {
            return Err(OtpError::NoActiveOtp);
        }

        Ok(())
    }

    /// Housekeeping for both stores. Correctness never depends on it running.
    pub async fn sweep_expired(&self) -> SweepStats {
        let stats = SweepStats {
            rate_limit_entries: self.limiter.sweep_expired().await,
            otp_records: self.store.sweep_expired(self.clock.now()).await,
        };
        debug!(
            rate_limit_entries = stats.rate_limit_entries,
            otp_records = stats.otp_records,
            "Swept expired auth state"
        );
        stats
    }
}
