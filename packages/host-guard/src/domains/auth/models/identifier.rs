use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::common::hash_identifier;
use crate::domains::auth::errors::OtpError;

/// RFC 5321 path limit
const MAX_IDENTIFIER_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;

lazy_static! {
    // Structural email check, applied after lower-casing. Requires a dotted
    // domain made of LDH labels.
    static ref EMAIL_SHAPE: Regex = Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$"
    ).unwrap();
}

/// A trimmed, lower-cased, structurally valid email address
///
/// Constructing one is the first thing every OTP operation does, so
/// malformed input is rejected before it touches limiter or store state.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NormalizedIdentifier(String);

impl NormalizedIdentifier {
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        let normalized = raw.trim().to_lowercase();

        if normalized.is_empty() || normalized.len() > MAX_IDENTIFIER_LEN {
            return Err(OtpError::MalformedIdentifier);
        }

        let local_len = normalized.split('@').next().map(str::len).unwrap_or(0);
        if local_len > MAX_LOCAL_PART_LEN {
            return Err(OtpError::MalformedIdentifier);
        }

        if !EMAIL_SHAPE.is_match(&normalized) {
            return Err(OtpError::MalformedIdentifier);
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA256 hex of the normalized form; the key for limiter and OTP stores
    pub fn hash(&self) -> String {
        hash_identifier(&self.0)
    }
}

// Keep raw addresses out of Debug output and therefore out of logs
impl fmt::Debug for NormalizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NormalizedIdentifier")
            .field(&"[email]")
            .finish()
    }
}
