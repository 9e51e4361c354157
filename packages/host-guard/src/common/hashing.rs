use sha2::{Digest, Sha256};

/// Hash a normalized identifier (email) using SHA256
///
/// Limiter and OTP stores are keyed by this hash so raw identifiers never
/// sit in process state. Callers must normalize first; the hash is
/// case-sensitive.
pub fn hash_identifier(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hex::encode(hasher.finalize())
}
