use argon2::{Algorithm, Argon2, Params, Version};
use rand::{Rng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::config::HashCost;

/// Bytes of Argon2id output stored per OTP
pub const HASH_LEN: usize = 32;
/// Bytes of random salt per OTP
pub const SALT_LEN: usize = 16;

/// A freshly generated passcode
///
/// Only ever handed to the delivery collaborator. `Debug` is redacted so the
/// code cannot leak through logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Uniformly random decimal code of exactly `length` digits, no leading zero
    pub fn generate(length: u32) -> Self {
        let low = 10u32.pow(length - 1);
        let high = 10u32.pow(length) - 1;
        let value = rand::rng().random_range(low..=high);
        Self(value.to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// Fresh random salt from the thread-local CSPRNG
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// True when `code` has the shape of an issued code of `length` digits.
/// Anything else can be rejected without paying for a hash.
pub fn is_well_formed(code: &str, length: u32) -> bool {
    code.len() == length as usize && code.bytes().all(|b| b.is_ascii_digit())
}

/// Salted Argon2id hashing for OTPs
#[derive(Debug, Clone, Copy)]
pub struct OtpHasher {
    cost: HashCost,
}

impl OtpHasher {
    pub fn new(cost: HashCost) -> Self {
        Self { cost }
    }

    pub fn hash(&self, code: &str, salt: &[u8; SALT_LEN]) -> Result<[u8; HASH_LEN], argon2::Error> {
        let params = Params::new(
            self.cost.memory_kib,
            self.cost.iterations,
            self.cost.parallelism,
            Some(HASH_LEN),
        )?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = [0u8; HASH_LEN];
        argon.hash_password_into(code.as_bytes(), salt, &mut out)?;
        Ok(out)
    }

    /// [`OtpHasher::hash`] on the blocking pool so the async workers stay free
    pub async fn hash_blocking(
        &self,
        code: String,
        salt: [u8; SALT_LEN],
    ) -> Result<[u8; HASH_LEN], String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&code, &salt))
            .await
            .map_err(|e| format!("hash task failed: {}", e))?
            .map_err(|e| e.to_string())
    }

    /// Constant-time comparison of two stored digests
    pub fn digests_match(expected: &[u8; HASH_LEN], actual: &[u8; HASH_LEN]) -> bool {
        expected.ct_eq(actual).into()
    }
}
