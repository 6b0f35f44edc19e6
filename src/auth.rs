//! Credentials attached to remote calls.
//!
//! The service accepts a bearer token either in the `Authorization` header
//! or in a `token` cookie. The client always sends the header; the cookie
//! parser exists so a token copied from a browser session can be reused.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, LocalCache};

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Cache key the session token is stored under.
pub const SESSION_KEY: &str = "session";

// =============================================================================
// Bearer Token
// =============================================================================

/// An opaque bearer credential.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw token. Returns `None` for blank input.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() { None } else { Some(Self(token)) }
    }

    /// Extracts the token from an `Authorization` header value
    /// (`Bearer <token>`, scheme case-insensitive).
    #[must_use]
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") {
            Self::new(token)
        } else {
            None
        }
    }

    /// Extracts the token from a `Cookie` header value.
    #[must_use]
    pub fn from_cookie_header(value: &str) -> Option<Self> {
        value
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .and_then(|(_, token)| Self::new(token))
    }

    /// Returns the raw secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("BearerToken(***)")
    }
}

// =============================================================================
// Credential Providers
// =============================================================================

/// Source of the credential for the next remote call.
pub trait CredentialProvider: Send + Sync {
    /// Returns the current token, or `None` if the user is signed out.
    fn token(&self) -> Option<BearerToken>;
}

/// A fixed credential (or none at all).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<BearerToken>);

impl StaticCredentials {
    #[must_use]
    pub const fn new(token: BearerToken) -> Self {
        Self(Some(token))
    }

    /// Credentials for a signed-out user.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<BearerToken> {
        self.0.clone()
    }
}

/// Credential that changes over the session (login / logout).
#[derive(Debug, Default)]
pub struct SessionCredentials {
    token: RwLock<Option<BearerToken>>,
}

impl SessionCredentials {
    #[must_use]
    pub fn new(token: Option<BearerToken>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Replaces the current token.
    pub fn sign_in(&self, token: BearerToken) {
        *self.token.write() = Some(token);
    }

    /// Forgets the current token.
    pub fn sign_out(&self) {
        *self.token.write() = None;
    }
}

impl CredentialProvider for SessionCredentials {
    fn token(&self) -> Option<BearerToken> {
        self.token.read().clone()
    }
}

// =============================================================================
// Session Store
// =============================================================================

/// Persists the session token in the local cache.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: LocalCache,
}

impl SessionStore {
    #[must_use]
    pub const fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    /// Loads the stored token. Unreadable or blank entries count as
    /// signed out.
    #[must_use]
    pub fn load(&self) -> Option<BearerToken> {
        self.cache
            .read::<Option<String>>(SESSION_KEY)
            .and_then(BearerToken::new)
    }

    /// Stores `token`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the token cannot be persisted.
    pub fn save(&self, token: &BearerToken) -> Result<(), CacheError> {
        self.cache.try_write(SESSION_KEY, token)
    }

    /// Removes the stored token.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the entry cannot be removed.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.cache.remove(SESSION_KEY)
    }
}
