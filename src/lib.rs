//! # ultimate-todo
//!
//! Optimistic, local-first synchronization of task and goal collections
//! against the Ultimate Todo REST service.
//!
//! ## Overview
//!
//! Every mutation is applied to an in-memory collection and mirrored to a
//! local cache immediately, then sent to the service. When the service
//! confirms, its record replaces the optimistic one; when it refuses, the
//! collection and the cache are rolled back and the user is notified.
//!
//! - **Domain**: tasks, goals, identifiers, partial updates, statistics
//! - **Store**: the reconciling in-memory collection
//! - **Cache**: versioned snapshot persistence (memory or files)
//! - **Remote**: the REST contract, over HTTP or in memory
//! - **Sync**: create / update / delete / toggle with rollback
//!
//! ## Example
//!
//! ```rust,ignore
//! use ultimate_todo::prelude::*;
//!
//! let client = TodoClient::from_config(&SyncConfig::from_env()?);
//! client.hydrate();
//! client.refresh().await?;
//! let task = client.tasks().create(TaskDraft::new("Buy milk")).await?;
//! client.tasks().toggle(&task.id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod remote;
pub mod store;
pub mod sync;
pub mod telemetry;

/// Commonly used types.
pub mod prelude {
    pub use crate::auth::{BearerToken, CredentialProvider, SessionCredentials, StaticCredentials};
    pub use crate::cache::LocalCache;
    pub use crate::client::TodoClient;
    pub use crate::config::SyncConfig;
    pub use crate::domain::{
        Completable, Entity, EntityId, Goal, GoalChanges, GoalDraft, GoalType, Patch, Priority,
        ServerId, Stats, Task, TaskChanges, TaskDraft, Timestamp,
    };
    pub use crate::error::SyncError;
    pub use crate::remote::{RemoteError, RemoteStore};
    pub use crate::sync::{Notification, Notifier, SyncEngine};
}
