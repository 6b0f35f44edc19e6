//! Client facade bundling the task and goal collections.

use std::sync::Arc;

use crate::auth::{BearerToken, CredentialProvider, SessionCredentials, SessionStore};
use crate::cache::{FileCacheStorage, LocalCache};
use crate::config::SyncConfig;
use crate::domain::{Goal, Stats, Task, Timestamp};
use crate::error::SyncError;
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::sync::{Notifier, SyncEngine, TracingNotifier};

/// Synchronized tasks and goals of one signed-in user.
///
/// Both engines share the same credentials, cache and notifier.
pub struct TodoClient {
    tasks: SyncEngine<Task>,
    goals: SyncEngine<Goal>,
    credentials: Arc<SessionCredentials>,
    session: SessionStore,
}

impl std::fmt::Debug for TodoClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TodoClient")
            .field("tasks", &self.tasks)
            .field("goals", &self.goals)
            .field("signed_in", &self.is_signed_in())
            .finish_non_exhaustive()
    }
}

impl TodoClient {
    /// Creates a client over the given remote stores.
    ///
    /// The session token is restored from `cache` if one was saved.
    #[must_use]
    pub fn new(
        tasks_remote: Arc<dyn RemoteStore<Task>>,
        goals_remote: Arc<dyn RemoteStore<Goal>>,
        cache: LocalCache,
    ) -> Self {
        let session = SessionStore::new(cache.clone());
        let credentials = Arc::new(SessionCredentials::new(session.load()));
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        Self {
            tasks: SyncEngine::new(tasks_remote, cache.clone(), credentials.clone())
                .with_notifier(notifier.clone()),
            goals: SyncEngine::new(goals_remote, cache, credentials.clone()).with_notifier(notifier),
            credentials,
            session,
        }
    }

    /// Creates a client talking to the configured service, caching to disk.
    ///
    /// A token from the configuration takes precedence over a saved session.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        let storage = Arc::new(FileCacheStorage::new(&config.cache_dir));
        let cache = LocalCache::new(storage, config.cache_namespace.clone());
        let http = reqwest::Client::new();
        let tasks: Arc<dyn RemoteStore<Task>> = Arc::new(HttpRemoteStore::with_client(
            http.clone(),
            &config.api_url,
            config.request_timeout,
        ));
        let goals: Arc<dyn RemoteStore<Goal>> = Arc::new(HttpRemoteStore::with_client(
            http,
            &config.api_url,
            config.request_timeout,
        ));

        let client = Self::new(tasks, goals, cache);
        if let Some(token) = &config.api_token {
            client.credentials.sign_in(token.clone());
        }
        tracing::debug!(api_url = %config.api_url, cache_dir = %config.cache_dir.display(), "Client configured");
        client
    }

    /// Routes notifications of both collections to `notifier`.
    #[must_use]
    pub fn with_notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            tasks: self.tasks.with_notifier(notifier.clone()),
            goals: self.goals.with_notifier(notifier),
            ..self
        }
    }

    #[must_use]
    pub const fn tasks(&self) -> &SyncEngine<Task> {
        &self.tasks
    }

    #[must_use]
    pub const fn goals(&self) -> &SyncEngine<Goal> {
        &self.goals
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.credentials.token().is_some()
    }

    /// Adopts `token` for subsequent calls and persists it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::StorageFailure` if the session cannot be saved;
    /// the token is still used for the current process.
    pub fn sign_in(&self, token: BearerToken) -> Result<(), SyncError> {
        self.credentials.sign_in(token.clone());
        self.session.save(&token)?;
        tracing::info!("Signed in");
        Ok(())
    }

    /// Forgets the token and both collections, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::StorageFailure` if the saved session or a cached
    /// snapshot cannot be removed. Every removal is still attempted.
    pub fn sign_out(&self) -> Result<(), SyncError> {
        self.credentials.sign_out();
        let tasks = self.tasks.clear();
        let goals = self.goals.clear();
        self.session.clear()?;
        tasks?;
        goals?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Loads both collections from the local cache.
    ///
    /// Returns the number of tasks and goals loaded.
    pub fn hydrate(&self) -> (usize, usize) {
        (self.tasks.hydrate(), self.goals.hydrate())
    }

    /// Refetches both collections concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the other collection is still refreshed
    /// if its own fetch succeeds.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let (tasks, goals) = futures::join!(self.tasks.refresh(), self.goals.refresh());
        tasks?;
        goals?;
        Ok(())
    }

    /// Aggregates the current snapshots.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats::compute(&self.tasks.snapshot(), &self.goals.snapshot(), Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GoalDraft, ServerId, TaskDraft};
    use crate::remote::InMemoryRemoteStore;
    use crate::sync::RecordingNotifier;
    use rstest::rstest;

    fn build_client(cache: &LocalCache) -> (TodoClient, InMemoryRemoteStore<Task>, InMemoryRemoteStore<Goal>) {
        let tasks = InMemoryRemoteStore::with_records(vec![
            Task::new(ServerId::new("t1"), "Buy milk").with_completed(true),
            Task::new(ServerId::new("t2"), "Walk dog"),
        ]);
        let goals = InMemoryRemoteStore::with_records(vec![Goal::new(ServerId::new("g1"), "Run 5k")]);
        let client = TodoClient::new(Arc::new(tasks.clone()), Arc::new(goals.clone()), cache.clone());
        (client, tasks, goals)
    }

    #[rstest]
    #[tokio::test]
    async fn test_signed_out_client_cannot_refresh() {
        let (client, tasks, _) = build_client(&LocalCache::in_memory("test"));

        assert!(!client.is_signed_in());
        assert!(matches!(client.refresh().await, Err(SyncError::AuthenticationRequired)));
        assert_eq!(tasks.total_calls(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_session_survives_restart() {
        let cache = LocalCache::in_memory("test");
        let (first, _, _) = build_client(&cache);
        first.sign_in(BearerToken::new("secret").unwrap()).unwrap();

        let (second, _, _) = build_client(&cache);
        assert!(second.is_signed_in());

        second.sign_out().unwrap();
        let (third, _, _) = build_client(&cache);
        assert!(!third.is_signed_in());
    }

    #[rstest]
    #[tokio::test]
    async fn test_refresh_and_stats() {
        let cache = LocalCache::in_memory("test");
        let (client, _, _) = build_client(&cache);
        client.sign_in(BearerToken::new("secret").unwrap()).unwrap();

        client.refresh().await.unwrap();
        let stats = client.stats();

        assert_eq!(stats.tasks.total, 2);
        assert_eq!(stats.tasks.completed, 1);
        assert_eq!(stats.goals.total, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_notifier_shared_by_collections() {
        let notifier = Arc::new(RecordingNotifier::new());
        let (client, _, _) = build_client(&LocalCache::in_memory("test"));
        let client = client.with_notifier(notifier.clone());
        client.sign_in(BearerToken::new("secret").unwrap()).unwrap();

        client.tasks().create(TaskDraft::new("Read")).await.unwrap();
        client.goals().create(GoalDraft::new("Learn Rust")).await.unwrap();

        let messages: Vec<String> = notifier
            .notifications()
            .into_iter()
            .map(|notification| notification.message)
            .collect();
        assert_eq!(messages, vec!["Task created", "Goal created"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_hydrate_after_restart() {
        let cache = LocalCache::in_memory("test");
        let (client, _, _) = build_client(&cache);
        client.sign_in(BearerToken::new("secret").unwrap()).unwrap();
        client.refresh().await.unwrap();

        let (restarted, _, _) = build_client(&cache);
        assert_eq!(restarted.hydrate(), (2, 1));
    }

    #[rstest]
    #[tokio::test]
    async fn test_sign_out_forgets_cached_collections() {
        let cache = LocalCache::in_memory("test");
        let (client, _, _) = build_client(&cache);
        client.sign_in(BearerToken::new("secret").unwrap()).unwrap();
        client.refresh().await.unwrap();
        client.tasks().create(TaskDraft::new("Private")).await.unwrap();

        client.sign_out().unwrap();

        assert!(client.tasks().is_empty());
        assert!(client.goals().is_empty());
        assert!(client.tasks().cached_snapshot().is_empty());
        let (next, _, _) = build_client(&cache);
        assert!(!next.is_signed_in());
        assert_eq!(next.hydrate(), (0, 0));
        assert!(next.tasks().snapshot().is_empty());
    }
}
