use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Messages shown to end users. Deliberately uninformative: they never reveal
/// whether an address is known or which verification check failed.
pub mod generic_messages {
    pub const OTP_SENT: &str = "If this address can sign in, a code is on its way.";
    pub const VERIFICATION_FAILED: &str =
        "Verification failed. Check the code or request a new one.";
    pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
    pub const INVALID_IDENTIFIER: &str = "Please enter a valid email address.";
    pub const ISSUE_FAILED: &str = "We couldn't send a code right now. Please try again later.";
}

/// OTP engine failures
///
/// The variants exist for logs, metrics and tests. Responses to end users
/// must use [`OtpError::user_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("identifier is not a valid email address")]
    MalformedIdentifier,

    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("no active OTP")]
    NoActiveOtp,

    #[error("OTP expired")]
    Expired,

    #[error("OTP attempts exhausted")]
    AttemptsExhausted,

    #[error("OTP mismatch ({attempts_remaining} attempts remaining)")]
    Mismatch { attempts_remaining: u32 },

    /// Hashing or delivery failed while issuing a code
    #[error("OTP could not be issued: {0}")]
    IssueFailed(String),

    /// Hashing failed while checking a code
    #[error("OTP hashing failed: {0}")]
    Hashing(String),
}

/// What an end user is allowed to see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

impl OtpError {
    /// Short stable name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OtpError::MalformedIdentifier => "malformed_identifier",
            OtpError::RateLimited { .. } => "rate_limited",
            OtpError::NoActiveOtp => "no_active_otp",
            OtpError::Expired => "expired",
            OtpError::AttemptsExhausted => "attempts_exhausted",
            OtpError::Mismatch { .. } => "mismatch",
            OtpError::IssueFailed(_) => "issue_failed",
            OtpError::Hashing(_) => "hashing",
        }
    }

    /// Collapse to the generic vocabulary. Every verification failure maps
    /// to the same message.
    pub fn user_message(&self) -> UserFacingError {
        let (message, retry_after) = match self {
            OtpError::MalformedIdentifier => (generic_messages::INVALID_IDENTIFIER, None),
            OtpError::RateLimited { reset_at } => {
                (generic_messages::TOO_MANY_REQUESTS, Some(*reset_at))
            }
            OtpError::IssueFailed(_) => (generic_messages::ISSUE_FAILED, None),
            OtpError::NoActiveOtp
            | OtpError::Expired
            | OtpError::AttemptsExhausted
            | OtpError::Mismatch { .. }
            | OtpError::Hashing(_) => (generic_messages::VERIFICATION_FAILED, None),
        };
        UserFacingError {
            message,
            retry_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_failures_are_indistinguishable() {
        let failures = [
            OtpError::NoActiveOtp,
            OtpError::Expired,
            OtpError::AttemptsExhausted,
            OtpError::Mismatch {
                attempts_remaining: 2,
            },
            OtpError::Hashing("boom".into()),
        ];

        for failure in failures {
            assert_eq!(
                failure.user_message(),
                UserFacingError {
                    message: generic_messages::VERIFICATION_FAILED,
                    retry_after: None,
                }
            );
        }
    }

    #[test]
    fn test_rate_limited_carries_only_retry_time() {
        let reset_at = Utc::now();
        let message = OtpError::RateLimited { reset_at }.user_message();

        assert_eq!(message.message, generic_messages::TOO_MANY_REQUESTS);
        assert_eq!(message.retry_after, Some(reset_at));
    }

    #[test]
    fn test_internal_detail_not_in_user_message() {
        let err = OtpError::IssueFailed("smtp relay 10.0.0.9 refused".into());
        let message = err.user_message();

        assert_eq!(message.message, generic_messages::ISSUE_FAILED);
        assert!(!message.message.contains("10.0.0.9"));
    }
}
