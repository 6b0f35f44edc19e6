//! Client configuration.
//!
//! Values come from environment variables (optionally via a `.env` file).
//! Parsing is written against a lookup function so it can be exercised
//! without touching the process environment.
//!
//! # Environment Variables
//!
//! - `TODO_API_URL`: service base URL (default: `http://localhost:3000`)
//! - `TODO_API_TOKEN`: bearer token (optional)
//! - `TODO_CACHE_DIR`: directory of the file cache (default: `.ultimate-todo`)
//! - `TODO_CACHE_NAMESPACE`: cache key prefix (default: `ultimate-todo`)
//! - `TODO_REQUEST_TIMEOUT_MS`: per-request timeout (default: 10000)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::auth::BearerToken;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_CACHE_DIR: &str = ".ultimate-todo";
pub const DEFAULT_CACHE_NAMESPACE: &str = "ultimate-todo";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Runtime configuration of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_url: String,
    pub api_token: Option<BearerToken>,
    pub cache_dir: PathBuf,
    pub cache_namespace: String,
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let api_url = match get("TODO_API_URL") {
            Some(url) => parse_url("TODO_API_URL", &url)?,
            None => defaults.api_url,
        };
        let request_timeout = match get("TODO_REQUEST_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_positive_u64("TODO_REQUEST_TIMEOUT_MS", &raw)?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_url,
            api_token: get("TODO_API_TOKEN").and_then(BearerToken::new),
            cache_dir: get("TODO_CACHE_DIR").map_or(defaults.cache_dir, PathBuf::from),
            cache_namespace: get("TODO_CACHE_NAMESPACE").unwrap_or(defaults.cache_namespace),
            request_timeout,
        })
    }

    /// Sets the service base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: BearerToken) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Sets the file cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }
}

fn parse_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an http(s) URL, got {value:?}"),
        })
    }
}

fn parse_positive_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: error.to_string(),
        }),
    }
}
