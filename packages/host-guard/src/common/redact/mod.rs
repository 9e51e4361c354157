/// Redaction of sensitive substrings from error text crossing the trust boundary
///
/// Every error surfaced to the untrusted UI goes through [`sanitize_error`],
/// which replaces filesystem paths, IP addresses and email addresses with
/// fixed placeholder tokens. Internal logs keep the original message.
///
/// ```rust
/// use host_guard_core::common::redact::sanitize_error;
///
/// let clean = sanitize_error("open /etc/hosts failed for 10.0.0.7 (ops@example.com)");
/// assert_eq!(clean, "open [path] failed for [ip] ([email])");
/// ```

pub mod detector;
pub mod redactor;

pub use detector::{detect_sensitive, Findings, SensitiveKind, SensitiveMatch};
pub use redactor::{redact, sanitize_error};
