use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::consent::{ConsentDecision, ConsentKey, ConsentRequest, ConsentStore, LOCAL_SESSION};
use super::errors::GatewayError;
use super::registry::{ChannelDescriptor, ChannelRegistry};
use crate::common::redact;
use crate::kernel::BaseConsentPrompt;

const MAX_OPERATION_LABEL_CHARS: usize = 200;

/// Who is asking, and how they describe the operation
#[derive(Debug, Clone, Default)]
pub struct RequesterContext {
    /// Window or client address; used for audit logs and prompts
    pub requester: String,
    /// Session the caller belongs to. "Always allow" grants are scoped to
    /// it; `None` means in-process host code ([`LOCAL_SESSION`]).
    pub session: Option<String>,
    /// Human-readable operation label. Controls consent granularity:
    /// "Start plugin X" and "Start plugin Y" are separate grants.
    /// Falls back to the channel description.
    pub operation: Option<String>,
}

impl RequesterContext {
    pub fn new(requester: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            session: None,
            operation: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn session(&self) -> &str {
        self.session.as_deref().unwrap_or(LOCAL_SESSION)
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// Why a request was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// Channel does not need consent
    NotRequired,
    /// An earlier "always allow" covers this operation
    Cached,
    /// User allowed this call only
    Once,
    /// User allowed this call and all identical ones in this session
    Always,
}

/// Allow-list + payload validation + consent gate for UI-to-host requests
pub struct ChannelGateway {
    registry: Arc<ChannelRegistry>,
    consent: ConsentStore,
    prompt: Arc<dyn BaseConsentPrompt>,
}

impl ChannelGateway {
    pub fn new(registry: Arc<ChannelRegistry>, prompt: Arc<dyn BaseConsentPrompt>) -> Self {
        Self::with_consent_store(registry, ConsentStore::new(), prompt)
    }

    pub fn with_consent_store(
        registry: Arc<ChannelRegistry>,
        consent: ConsentStore,
        prompt: Arc<dyn BaseConsentPrompt>,
    ) -> Self {
        Self {
            registry,
            consent,
            prompt,
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn consent_store(&self) -> &ConsentStore {
        &self.consent
    }

    /// Check that `channel` is registered and `payload` fits its shape.
    pub fn validate(
        &self,
        channel: &str,
        payload: Option<&Value>,
    ) -> Result<&ChannelDescriptor, GatewayError> {
        let descriptor = self
            .registry
            .get(channel)
            .ok_or_else(|| GatewayError::UnknownChannel(channel.to_string()))?;

        descriptor
            .payload_shape
            .validate(payload)
            .map_err(|detail| GatewayError::PayloadSchemaViolation {
                channel: descriptor.name.to_string(),
                detail,
            })?;

        Ok(descriptor)
    }

    /// Decide whether the caller may execute `channel` with `payload`.
    ///
    /// Validation always runs before consent so malformed requests never
    /// reach the user. The consent prompt is awaited without holding the
    /// consent store lock; other requests proceed while a user decides.
    pub async fn authorize(
        &self,
        channel: &str,
        payload: Option<&Value>,
        ctx: &RequesterContext,
    ) -> Result<Grant, GatewayError> {
        let result = self.authorize_inner(channel, payload, ctx).await;

        match &result {
            Ok(grant) => info!(
                channel = %channel,
                requester = %ctx.requester,
                grant = ?grant,
                "Channel request authorized"
            ),
            Err(e) => warn!(
                channel = %channel,
                requester = %ctx.requester,
                kind = e.kind(),
                error = %e,
                "Channel request rejected"
            ),
        }

        result
    }

    async fn authorize_inner(
        &self,
        channel: &str,
        payload: Option<&Value>,
        ctx: &RequesterContext,
    ) -> Result<Grant, GatewayError> {
        let descriptor = self.validate(channel, payload)?;

        if !descriptor.requires_consent {
            return Ok(Grant::NotRequired);
        }

        let operation = operation_label(descriptor, ctx)?;
        let key = ConsentKey::new(descriptor.name, &operation);
        let session = ctx.session();

        if self.consent.contains(session, &key).await {
            debug!(consent_key = %key, "Using cached consent");
            return Ok(Grant::Cached);
        }

        let decision = self
            .prompt
            .prompt_user(ConsentRequest {
                channel: descriptor.name.to_string(),
                operation: operation.clone(),
                requester: ctx.requester.clone(),
            })
            .await;

        match decision {
            ConsentDecision::AllowOnce => Ok(Grant::Once),
            ConsentDecision::AlwaysAllow => {
                self.consent.grant(session, key).await;
                Ok(Grant::Always)
            }
            ConsentDecision::Deny => Err(GatewayError::UserDenied {
                channel: descriptor.name.to_string(),
                operation,
            }),
        }
    }

    /// Revoke every cached grant in every session
    pub async fn clear_consent(&self) {
        let revoked = self.consent.clear().await;
        info!(revoked, "Cleared cached consent");
    }

    /// Revoke the grants of one session (logout)
    pub async fn clear_session_consent(&self, session: &str) {
        let revoked = self.consent.clear_session(session).await;
        info!(revoked, "Cleared session consent");
    }

    /// Redact paths, IPs and emails from a message bound for the UI
    pub fn sanitize_error(&self, message: &str) -> String {
        redact::sanitize_error(message)
    }
}

fn operation_label(
    descriptor: &ChannelDescriptor,
    ctx: &RequesterContext,
) -> Result<String, GatewayError> {
    let Some(label) = ctx.operation.as_deref() else {
        return Ok(descriptor.description.to_string());
    };

    let label = label.trim();
    let reject = |detail: &str| GatewayError::PayloadSchemaViolation {
        channel: descriptor.name.to_string(),
        detail: detail.to_string(),
    };

    if label.is_empty() {
        return Err(reject("operation label must not be empty"));
    }
    if label.chars().count() > MAX_OPERATION_LABEL_CHARS {
        return Err(reject("operation label is too long"));
    }
    if label.chars().any(char::is_control) {
        return Err(reject("operation label contains control characters"));
    }

    Ok(label.to_string())
}
