//! Errors surfaced by sync operations.

use thiserror::Error;

use crate::cache::CacheError;
use crate::domain::EntityId;
use crate::remote::RemoteError;
use crate::store::StoreError;

/// Failure of a sync operation.
///
/// `AuthenticationRequired` and `NotFound` are detected locally before any
/// optimistic mutation. `RemoteRejected` is returned only after the
/// optimistic mutation has been rolled back.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// No credential is available for the remote call.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The addressed entity is not in the collection.
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    /// The remote store failed or refused the request.
    #[error("{0}")]
    RemoteRejected(#[from] RemoteError),

    /// Local storage failed in an operation whose purpose is storage.
    ///
    /// Snapshot mirroring never produces this: those failures are logged.
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] CacheError),
}

impl SyncError {
    /// Returns the message shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::RemoteRejected(error) => error.message(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if the failure happened after an optimistic mutation
    /// was applied (and then rolled back).
    #[must_use]
    pub const fn was_rolled_back(&self) -> bool {
        matches!(self, Self::RemoteRejected(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(id),
        }
    }
}
