//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PAGBANK_TOKEN` - PagBank API bearer token (high entropy, no placeholders)
//!
//! ## Optional
//! - `LIMODA_HOST` - Bind address (default: 127.0.0.1)
//! - `LIMODA_PORT` - Listen port (default: 3000)
//! - `PAGBANK_BASE_URL` - PagBank API endpoint override (default: production)
//! - `PAGBANK_NOTIFICATION_URL` - Webhook URL registered with each gateway order
//! - `VIACEP_BASE_URL` - ViaCEP endpoint override (default: production)
//! - `LIMODA_SEED_FILE` - Path to a JSON file with catalog/customer seed data

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// PagBank payment gateway configuration
    pub pagbank: PagBankConfig,
    /// ViaCEP endpoint override (None uses the production endpoint)
    pub viacep_base_url: Option<String>,
    /// Optional JSON seed file loaded into the store at startup
    pub seed_file: Option<PathBuf>,
}

/// PagBank payment gateway configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct PagBankConfig {
    /// API bearer token
    pub token: SecretString,
    /// Endpoint override (None uses the production endpoint)
    pub base_url: Option<String>,
    /// Webhook URL registered with each gateway order
    pub notification_url: Option<String>,
}

impl std::fmt::Debug for PagBankConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagBankConfig")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("notification_url", &self.notification_url)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the gateway token fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("LIMODA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LIMODA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("LIMODA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("LIMODA_PORT".to_string(), e.to_string()))?;

        let pagbank = PagBankConfig::from_env()?;
        let viacep_base_url = get_base_url_override("VIACEP_BASE_URL")?;
        let seed_file = get_optional_env("LIMODA_SEED_FILE").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            pagbank,
            viacep_base_url,
            seed_file,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PagBankConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: get_validated_secret("PAGBANK_TOKEN")?,
            base_url: get_base_url_override("PAGBANK_BASE_URL")?,
            notification_url: match get_optional_env("PAGBANK_NOTIFICATION_URL") {
                Some(raw) => Some(validate_http_url("PAGBANK_NOTIFICATION_URL", &raw)?),
                None => None,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional base URL override, validated if present.
fn get_base_url_override(key: &str) -> Result<Option<String>, ConfigError> {
    match get_optional_env(key) {
        Some(raw) => Ok(Some(validate_http_url(key, &raw)?)),
        None => Ok(None),
    }
}

/// Validate that a value is an http(s) URL; trailing slashes are stripped so
/// clients can append paths.
fn validate_http_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let parsed =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API tokens have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_uniform() {
        // All same character = 0 entropy
        assert!((shannon_entropy("zzzzzzzz") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("9fK#2qW@7xZ$4mN!");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-pagbank-token-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("9fK#2qW@7xZ$4mN!6jH%1dG^8sL&3pR", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_http_url_strips_trailing_slash() {
        let url = validate_http_url("TEST_URL", "http://localhost:9080/").unwrap();
        assert_eq!(url, "http://localhost:9080");
    }

    #[test]
    fn test_validate_http_url_rejects_bad_scheme() {
        let result = validate_http_url("TEST_URL", "ftp://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_http_url_rejects_garbage() {
        let result = validate_http_url("TEST_URL", "not a url at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            pagbank: PagBankConfig {
                token: SecretString::from("9fK#2qW@7xZ$4mN!6jH%1dG^8sL&3pR"),
                base_url: None,
                notification_url: None,
            },
            viacep_base_url: None,
            seed_file: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_pagbank_config_debug_redacts_token() {
        let config = PagBankConfig {
            token: SecretString::from("very_private_bearer_token"),
            base_url: Some("http://localhost:9080".to_string()),
            notification_url: None,
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("localhost:9080"));
        assert!(!debug_output.contains("very_private_bearer_token"));
    }
}
