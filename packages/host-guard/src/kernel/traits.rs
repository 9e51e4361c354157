// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - the collaborators the security core
// calls out to but never implements itself.
//
// Naming convention: Base* for trait names (e.g., BaseConsentPrompt)

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::channels::{ConsentDecision, ConsentRequest};

// =============================================================================
// Consent Prompt Trait (Infrastructure - UI dialog)
// =============================================================================

#[async_trait]
pub trait BaseConsentPrompt: Send + Sync {
    /// Ask the user to approve an operation and wait for the answer.
    ///
    /// Implementations must return `Deny` when the prompt is dismissed,
    /// cancelled or otherwise ends without an explicit choice.
    async fn prompt_user(&self, request: ConsentRequest) -> ConsentDecision;
}

// =============================================================================
// OTP Delivery Trait (Infrastructure - email/SMS)
// =============================================================================

#[async_trait]
pub trait BaseOtpDelivery: Send + Sync {
    /// Send `code` to `identifier` out-of-band
    async fn deliver(&self, identifier: &str, code: &str) -> Result<()>;
}
