use anyhow::{Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use typed_builder::TypedBuilder;

const MIN_HOST_UI_TOKEN_LEN: usize = 32;

/// Argon2id cost parameters for OTP hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    /// OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashCost {
    /// Smallest parameters Argon2 accepts. Tests only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Security knobs for the OTP engine and consent gateway
///
/// ```rust
/// use host_guard_core::SecurityConfig;
///
/// let config = SecurityConfig::builder().otp_max_attempts(5).build();
/// assert_eq!(config.otp_length, 6);
/// assert_eq!(config.otp_max_attempts, 5);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct SecurityConfig {
    /// Digits per OTP
    #[builder(default = 6)]
    pub otp_length: u32,
    #[builder(default = Duration::minutes(10))]
    pub otp_expiry: Duration,
    /// Verification attempts per issued OTP
    #[builder(default = 3)]
    pub otp_max_attempts: u32,
    #[builder(default = Duration::minutes(15))]
    pub rate_limit_window: Duration,
    /// OTP requests per identifier per window
    #[builder(default = 5)]
    pub rate_limit_max_requests: u32,
    #[builder(default)]
    pub hash_cost: HashCost,
    /// Treat an unanswered consent prompt as a denial after this long.
    /// `None` waits for the user indefinitely.
    #[builder(default)]
    pub consent_prompt_timeout: Option<std::time::Duration>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OTP length must be between 4 and 9 digits, got {0}")]
    InvalidOtpLength(u32),

    #[error("OTP expiry must be positive")]
    NonPositiveExpiry,

    #[error("OTP max attempts must be at least 1")]
    ZeroAttempts,

    #[error("rate limit window must be positive")]
    NonPositiveWindow,

    #[error("rate limit max requests must be at least 1")]
    ZeroMaxRequests,

    #[error("invalid OTP hash cost: {0}")]
    InvalidHashCost(String),
}

impl SecurityConfig {
    /// Reject values that would make the engine meaningless or unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=9).contains(&self.otp_length) {
            return Err(ConfigError::InvalidOtpLength(self.otp_length));
        }
        if self.otp_expiry <= Duration::zero() {
            return Err(ConfigError::NonPositiveExpiry);
        }
        if self.otp_max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.rate_limit_window <= Duration::zero() {
            return Err(ConfigError::NonPositiveWindow);
        }
        if self.rate_limit_max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        argon2::Params::new(
            self.hash_cost.memory_kib,
            self.hash_cost.iterations,
            self.hash_cost.parallelism,
            None,
        )
        .map_err(|e| ConfigError::InvalidHashCost(e.to_string()))?;
        Ok(())
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub session_lifetime: Duration,
    /// Peers whose X-Forwarded-For / X-Real-IP headers are believed
    pub trusted_proxies: Vec<IpAddr>,
    /// Loopback port for the host UI's consent queue
    pub host_ui_port: u16,
    /// Capability the host UI presents on that port
    pub host_ui_token: String,
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = HashCost::default();
        let security = SecurityConfig::builder()
            .otp_length(env_or("OTP_LENGTH", 6)?)
            .otp_expiry(Duration::minutes(env_or("OTP_EXPIRY_MINUTES", 10)?))
            .otp_max_attempts(env_or("OTP_MAX_ATTEMPTS", 3)?)
            .rate_limit_window(Duration::minutes(env_or("RATE_LIMIT_WINDOW_MINUTES", 15)?))
            .rate_limit_max_requests(env_or("RATE_LIMIT_MAX_REQUESTS", 5)?)
            .hash_cost(HashCost {
                memory_kib: env_or("OTP_HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: env_or("OTP_HASH_ITERATIONS", defaults.iterations)?,
                parallelism: defaults.parallelism,
            })
            .consent_prompt_timeout(
                env_opt::<u64>("CONSENT_PROMPT_TIMEOUT_SECS")?
                    .map(std::time::Duration::from_secs),
            )
            .build();
        security
            .validate()
            .context("Invalid security configuration")?;

        let host_ui_token = env::var("HOST_UI_TOKEN").context("HOST_UI_TOKEN must be set")?;
        if host_ui_token.len() < MIN_HOST_UI_TOKEN_LEN {
            anyhow::bail!(
                "HOST_UI_TOKEN must be at least {} characters",
                MIN_HOST_UI_TOKEN_LEN
            );
        }

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8787)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "host-guard".to_string()),
            session_lifetime: Duration::hours(env_or("SESSION_LIFETIME_HOURS", 24)?),
            trusted_proxies: parse_ip_list(&env::var("TRUSTED_PROXIES").unwrap_or_default())
                .context("TRUSTED_PROXIES must be a comma-separated list of IP addresses")?,
            host_ui_port: env_or("HOST_UI_PORT", 8788)?,
            host_ui_token,
            security,
        })
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, std::net::AddrParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(env_opt(key)?.unwrap_or(default))
}

fn env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(None),
    }
}
