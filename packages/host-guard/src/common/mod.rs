// Common types and utilities shared across the application

pub mod clock;
pub mod hashing;
pub mod rate_limit;
pub mod redact;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use hashing::hash_identifier;
pub use rate_limit::{RateLimitDecision, RateLimitEntry, RateLimiter};
pub use redact::sanitize_error;
