//! In-memory remote store with fail injection.
//!
//! Behaves like the service for one collection: assigns server ids,
//! applies partial updates, checks the bearer token. On top of that it can
//! be told to fail, to slow down, or to fail at random:
//!
//! - **Scripted failures**: [`InMemoryRemoteStore::fail_next`] queues an
//!   error for the next call of one operation.
//! - **Latency**: every call sleeps for a fixed delay before touching state.
//! - **Random failures**: a seeded RNG fails calls with a given probability,
//!   deterministically for a given seed.
//!
//! Injected failures leave the stored records untouched, like a request
//! rejected before the service committed anything.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::{RemoteError, RemoteFuture, RemoteStore};
use crate::auth::BearerToken;
use crate::domain::{Entity, EntityId, ServerId, Timestamp};

// =============================================================================
// Operation
// =============================================================================

/// Remote operation kinds, used to target injected failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

// =============================================================================
// Fail Injection Config
// =============================================================================

/// Configuration for fail injection.
#[derive(Debug, Clone, PartialEq)]
pub struct FailInjectionConfig {
    /// Probability of failing a call (0.0 - 1.0).
    pub failure_rate: f64,
    /// Delay applied to every call.
    pub latency: Duration,
    /// Seed for the failure RNG.
    pub seed: u64,
}

impl Default for FailInjectionConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.0,
            latency: Duration::ZERO,
            seed: 0,
        }
    }
}

/// Fail injection validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailInjectionError {
    /// Failure rate out of range.
    #[error("Invalid failure rate: must be 0.0-1.0, got {0}")]
    InvalidFailureRate(f64),
}

impl FailInjectionConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `failure_rate` is not in range `0.0..=1.0`.
    pub fn new(failure_rate: f64, latency: Duration, seed: u64) -> Result<Self, FailInjectionError> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(FailInjectionError::InvalidFailureRate(failure_rate));
        }
        Ok(Self {
            failure_rate,
            latency,
            seed,
        })
    }

    /// Returns whether any injection is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.failure_rate > 0.0 || !self.latency.is_zero()
    }
}

// =============================================================================
// State
// =============================================================================

struct State<E> {
    records: Vec<E>,
    scripted: HashMap<Operation, VecDeque<RemoteError>>,
    calls: HashMap<Operation, usize>,
    rng: StdRng,
}

struct Inner<E> {
    state: Mutex<State<E>>,
    config: FailInjectionConfig,
    required_token: Option<BearerToken>,
    next_id: AtomicU64,
}

impl<E: Entity> Inner<E> {
    /// Bookkeeping common to every call: counting, auth, injected failures.
    fn admit(&self, operation: Operation, token: &BearerToken) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        *state.calls.entry(operation).or_default() += 1;

        if self
            .required_token
            .as_ref()
            .is_some_and(|required| required != token)
        {
            return Err(RemoteError::Unauthorized("Invalid token".to_string()));
        }
        if let Some(error) = state
            .scripted
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if self.config.failure_rate > 0.0 {
            let failure_rate = self.config.failure_rate;
            if state.rng.random_bool(failure_rate) {
                return Err(RemoteError::Rejected {
                    status: 503,
                    message: "Injected failure".to_string(),
                });
            }
        }
        Ok(())
    }

    fn generate_id(&self) -> ServerId {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ServerId::new(format!("{sequence:024x}"))
    }
}

fn not_found(id: &ServerId) -> RemoteError {
    RemoteError::Rejected {
        status: 404,
        message: format!("{id} not found"),
    }
}

// =============================================================================
// In-Memory Remote Store
// =============================================================================

/// Remote store kept in process memory.
///
/// Cloning yields a handle to the same records.
pub struct InMemoryRemoteStore<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for InMemoryRemoteStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Default for InMemoryRemoteStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryRemoteStore<E> {
    /// Creates an empty store accepting any token, without fail injection.
    #[must_use]
    pub fn new() -> Self {
        Self::build(Vec::new(), FailInjectionConfig::default(), None)
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: Vec<E>) -> Self {
        Self::build(records, FailInjectionConfig::default(), None)
    }

    /// Creates a store with the given fail injection.
    #[must_use]
    pub fn with_fail_injection(config: FailInjectionConfig) -> Self {
        Self::build(Vec::new(), config, None)
    }

    /// Returns a store that only accepts `token`.
    #[must_use]
    pub fn requiring_token(token: BearerToken) -> Self {
        Self::build(Vec::new(), FailInjectionConfig::default(), Some(token))
    }

    fn build(
        records: Vec<E>,
        config: FailInjectionConfig,
        required_token: Option<BearerToken>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    records,
                    scripted: HashMap::new(),
                    calls: HashMap::new(),
                    rng,
                }),
                config,
                required_token,
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Calls queue up: scheduling two failures fails the next two calls.
    pub fn fail_next(&self, operation: Operation, error: RemoteError) {
        self.inner
            .state
            .lock()
            .scripted
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Returns the stored records.
    #[must_use]
    pub fn records(&self) -> Vec<E> {
        self.inner.state.lock().records.clone()
    }

    /// Returns how many times `operation` was called, failed calls included.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.inner
            .state
            .lock()
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total number of calls across operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.inner.state.lock().calls.values().sum()
    }
}

impl<E: Entity> RemoteStore<E> for InMemoryRemoteStore<E> {
    fn list(&self, token: &BearerToken) -> RemoteFuture<Vec<E>> {
        let inner = Arc::clone(&self.inner);
        let token = token.clone();
        Box::pin(async move {
            tokio::time::sleep(inner.config.latency).await;
            inner.admit(Operation::List, &token)?;
            Ok(inner.state.lock().records.clone())
        })
    }

    fn create(&self, token: &BearerToken, draft: &E::Draft) -> RemoteFuture<E> {
        let inner = Arc::clone(&self.inner);
        let token = token.clone();
        let draft = draft.clone();
        Box::pin(async move {
            tokio::time::sleep(inner.config.latency).await;
            inner.admit(Operation::Create, &token)?;
            let id = EntityId::Server(inner.generate_id());
            let entity = E::from_draft(id, &draft, Timestamp::now());
            inner.state.lock().records.insert(0, entity.clone());
            Ok(entity)
        })
    }

    fn update(&self, token: &BearerToken, id: &ServerId, changes: &E::Changes) -> RemoteFuture<E> {
        let inner = Arc::clone(&self.inner);
        let token = token.clone();
        let id = id.clone();
        let changes = changes.clone();
        Box::pin(async move {
            tokio::time::sleep(inner.config.latency).await;
            inner.admit(Operation::Update, &token)?;
            let mut state = inner.state.lock();
            let key = EntityId::Server(id.clone());
            let entity = state
                .records
                .iter_mut()
                .find(|record| record.id() == &key)
                .ok_or_else(|| not_found(&id))?;
            entity.apply(&changes, Timestamp::now());
            Ok(entity.clone())
        })
    }

    fn delete(&self, token: &BearerToken, id: &ServerId) -> RemoteFuture<()> {
        let inner = Arc::clone(&self.inner);
        let token = token.clone();
        let id = id.clone();
        Box::pin(async move {
            tokio::time::sleep(inner.config.latency).await;
            inner.admit(Operation::Delete, &token)?;
            let mut state = inner.state.lock();
            let key = EntityId::Server(id.clone());
            let position = state
                .records
                .iter()
                .position(|record| record.id() == &key)
                .ok_or_else(|| not_found(&id))?;
            state.records.remove(position);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
