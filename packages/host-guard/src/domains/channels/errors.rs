use thiserror::Error;

use crate::common::redact::sanitize_error;

/// Gateway rejections
///
/// `Display` is for internal logs and may contain caller-supplied text.
/// Anything shown to the UI must go through [`GatewayError::boundary_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid payload for {channel}: {detail}")]
    PayloadSchemaViolation { channel: String, detail: String },

    #[error("user denied '{operation}' on {channel}")]
    UserDenied { channel: String, operation: String },
}

impl GatewayError {
    /// Short stable name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownChannel(_) => "unknown_channel",
            GatewayError::PayloadSchemaViolation { .. } => "payload_schema_violation",
            GatewayError::UserDenied { .. } => "user_denied",
        }
    }

    /// Redacted message safe to return across the trust boundary
    pub fn boundary_message(&self) -> String {
        sanitize_error(&self.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("channel registered twice: {0}")]
    DuplicateChannel(String),
}
