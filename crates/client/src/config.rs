//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TIENDA_API_URL` - Backend origin; `/api` is appended (default: `http://localhost:4000`)
//! - `TIENDA_CREDENTIAL_FILE` - Where the session credential is persisted
//!   (default: `$HOME/.tienda/credentials.json`)
//! - `TIENDA_NOTICE_TTL_MS` - How long notices stay visible (default: 4000)
//! - `TIENDA_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_ORIGIN: &str = "http://localhost:4000";
const DEFAULT_NOTICE_TTL_MS: u64 = 4000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const CREDENTIAL_FILE_NAME: &str = "credentials.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every gateway path is joined onto (ends in `/api`, no trailing slash)
    pub api_base_url: String,
    /// File backing the client-local key/value store
    pub credential_file: PathBuf,
    /// Notice expiry delay
    pub notice_ttl: Duration,
    /// Per-request timeout for gateway calls
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let origin = lookup("TIENDA_API_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string());
        let api_base_url = api_base_url(&origin)?;

        let credential_file = lookup("TIENDA_CREDENTIAL_FILE").map_or_else(
            || default_credential_file(lookup("HOME")),
            PathBuf::from,
        );

        let notice_ttl = Duration::from_millis(parse_or_default(
            &lookup,
            "TIENDA_NOTICE_TTL_MS",
            DEFAULT_NOTICE_TTL_MS,
        )?);
        let request_timeout = Duration::from_secs(parse_or_default(
            &lookup,
            "TIENDA_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty());

        Ok(Self {
            api_base_url,
            credential_file,
            notice_ttl,
            request_timeout,
            sentry_dsn,
        })
    }

    /// Configuration pointing at `origin` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `origin` is not a valid URL.
    pub fn for_origin(origin: &str, credential_file: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: api_base_url(origin)?,
            credential_file,
            notice_ttl: Duration::from_millis(DEFAULT_NOTICE_TTL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Trim trailing slashes from the origin, validate it, and append `/api`.
fn api_base_url(origin: &str) -> Result<String, ConfigError> {
    let origin = origin.trim_end_matches('/');
    Url::parse(origin)
        .map_err(|e| ConfigError::InvalidEnvVar("TIENDA_API_URL".to_string(), e.to_string()))?;
    Ok(format!("{origin}/api"))
}

fn default_credential_file(home: Option<String>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".tienda").join(CREDENTIAL_FILE_NAME),
        None => PathBuf::from(".tienda-credentials.json"),
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or_default(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
