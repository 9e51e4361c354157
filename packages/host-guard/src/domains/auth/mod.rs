//! Auth domain - passwordless sign-in via email one-time passcodes
//!
//! Responsibilities:
//! - OTP issue behind a per-identifier rate limit
//! - Salted Argon2id storage of codes, constant-time verification
//! - Expiry and attempt budgets per outstanding code
//! - Session JWTs for verified identifiers
//! - Enumeration-resistant user-facing messages

pub mod code;
pub mod engine;
pub mod errors;
pub mod jwt;
pub mod models;

pub use code::{OtpCode, OtpHasher};
pub use engine::{OtpEngine, OtpSent, SweepStats, Verified};
pub use errors::{generic_messages, OtpError, UserFacingError};
pub use jwt::{Claims, JwtService, SessionToken, SessionTokenError};
pub use models::{NormalizedIdentifier, OtpRecord, OtpStore};
