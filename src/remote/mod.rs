//! Remote store: the durable source of truth.
//!
//! [`RemoteStore`] is the CRUD contract sync operations consume. Every
//! method returns a boxed `'static` future so implementations can be shared
//! as trait objects and awaited after the caller's borrows end.

pub mod http;
pub mod in_memory;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::auth::BearerToken;
use crate::domain::{Entity, ServerId};

pub use http::{AuthClient, HttpRemoteStore};
pub use in_memory::{FailInjectionConfig, FailInjectionError, InMemoryRemoteStore, Operation};

// =============================================================================
// Remote Error
// =============================================================================

/// Failures reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The credential was missing, expired, or rejected (HTTP 401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The service answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    /// The request did not complete in time.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The service could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Returns the HTTP status associated with the failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Timeout(_) | Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Returns the message meant for the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { message, .. } | Self::Unauthorized(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Future returned by remote store operations.
pub type RemoteFuture<T> = BoxFuture<'static, Result<T, RemoteError>>;

// =============================================================================
// Remote Store
// =============================================================================

/// CRUD access to one entity collection on the service.
pub trait RemoteStore<E: Entity>: Send + Sync {
    /// Fetches the whole collection of the signed-in user.
    fn list(&self, token: &BearerToken) -> RemoteFuture<Vec<E>>;

    /// Creates an entity and returns the persisted record.
    fn create(&self, token: &BearerToken, draft: &E::Draft) -> RemoteFuture<E>;

    /// Applies a partial update and returns the authoritative record.
    ///
    /// The service may normalize fields, so callers must adopt the returned
    /// value rather than their own merge.
    fn update(&self, token: &BearerToken, id: &ServerId, changes: &E::Changes) -> RemoteFuture<E>;

    /// Deletes an entity.
    fn delete(&self, token: &BearerToken, id: &ServerId) -> RemoteFuture<()>;

    /// Returns the store name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_error_display() {
        let error = RemoteError::Rejected {
            status: 500,
            message: "Server exploded".to_string(),
        };
        assert_eq!(error.to_string(), "Server exploded (HTTP 500)");
        assert_eq!(error.message(), "Server exploded");
        assert_eq!(error.status(), Some(500));

        let error = RemoteError::Timeout(250);
        assert_eq!(error.to_string(), "Timeout after 250ms");
        assert_eq!(error.status(), None);
    }

    #[rstest]
    fn test_unauthorized_maps_to_401() {
        let error = RemoteError::Unauthorized("Token expired".to_string());
        assert_eq!(error.status(), Some(401));
        assert_eq!(error.message(), "Token expired");
    }
}
