//! HTTP implementation of the remote store.
//!
//! Talks to the Ultimate Todo REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list      | `GET    {base}/api/{collection}` |
//! | create    | `POST   {base}/api/{collection}` |
//! | update    | `PATCH  {base}/api/{collection}/{id}` |
//! | delete    | `DELETE {base}/api/{collection}/{id}` |
//!
//! Success bodies are either the bare payload or `{"data": payload}`.
//! Error bodies carry `{"message": ...}` or `{"error": ...}`.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{RemoteError, RemoteFuture, RemoteStore};
use crate::auth::BearerToken;
use crate::domain::{Entity, ServerId};

// =============================================================================
// Wire Helpers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Bare(T),
    Wrapped { data: T },
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Bare(value) | Self::Wrapped { data: value } => value,
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn map_send_error(error: &reqwest::Error, timeout: Duration) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    } else {
        RemoteError::Transport(error.to_string())
    }
}

/// Turns a non-success response into a `RemoteError`.
async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        RemoteError::Unauthorized(message)
    } else {
        RemoteError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response, RemoteError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|error| map_send_error(&error, timeout))?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, RemoteError> {
    let response = send(request, timeout).await?;
    response
        .json::<Payload<T>>()
        .await
        .map(Payload::into_inner)
        .map_err(|error| RemoteError::Decode(error.to_string()))
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Appends `segments` to `base_url`, percent-encoding each one.
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(base_url)
        .map_err(|error| RemoteError::Transport(format!("invalid base URL {base_url}: {error}")))?;
    url.path_segments_mut()
        .map_err(|()| RemoteError::Transport(format!("base URL {base_url} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// =============================================================================
// Http Remote Store
// =============================================================================

/// Remote store backed by the service's REST API.
pub struct HttpRemoteStore<E> {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    _entity: PhantomData<fn() -> E>,
}

impl<E> std::fmt::Debug for HttpRemoteStore<E> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> HttpRemoteStore<E> {
    /// Creates a store talking to `base_url` (e.g. `http://localhost:3000`).
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    /// Creates a store sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            timeout,
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> Result<Url, RemoteError> {
        endpoint(&self.base_url, &["api", E::COLLECTION])
    }

    fn entity_url(&self, id: &ServerId) -> Result<Url, RemoteError> {
        endpoint(&self.base_url, &["api", E::COLLECTION, id.as_str()])
    }
}

impl<E: Entity> RemoteStore<E> for HttpRemoteStore<E> {
    fn list(&self, token: &BearerToken) -> RemoteFuture<Vec<E>> {
        let request = self
            .collection_url()
            .map(|url| self.client.get(url).bearer_auth(token.expose()));
        let timeout = self.timeout;
        Box::pin(async move { send_json(request?, timeout).await })
    }

    fn create(&self, token: &BearerToken, draft: &E::Draft) -> RemoteFuture<E> {
        let request = self
            .collection_url()
            .map(|url| self.client.post(url).bearer_auth(token.expose()).json(draft));
        let timeout = self.timeout;
        Box::pin(async move { send_json(request?, timeout).await })
    }

    fn update(&self, token: &BearerToken, id: &ServerId, changes: &E::Changes) -> RemoteFuture<E> {
        let request = self
            .entity_url(id)
            .map(|url| self.client.patch(url).bearer_auth(token.expose()).json(changes));
        let timeout = self.timeout;
        Box::pin(async move { send_json(request?, timeout).await })
    }

    fn delete(&self, token: &BearerToken, id: &ServerId) -> RemoteFuture<()> {
        let request = self
            .entity_url(id)
            .map(|url| self.client.delete(url).bearer_auth(token.expose()));
        let timeout = self.timeout;
        Box::pin(async move { send(request?, timeout).await.map(drop) })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// =============================================================================
// Auth Client
// =============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Client for the account endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AuthClient {
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
            timeout,
        }
    }

    /// Signs in and returns the session token.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` for bad credentials, or any other
    /// `RemoteError` if the request fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<BearerToken, RemoteError> {
        let request = self
            .client
            .post(endpoint(&self.base_url, &["api", "auth", "login"])?)
            .json(&LoginRequest { email, password });
        let response: TokenResponse = send_json(request, self.timeout).await?;
        BearerToken::new(response.token)
            .ok_or_else(|| RemoteError::Decode("empty token in login response".to_string()))
    }

    /// Creates an account and returns the session token.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` if the service refuses the account
    /// (e.g. the email is taken), or any other `RemoteError` if the request fails.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<BearerToken, RemoteError> {
        let request = self
            .client
            .post(endpoint(&self.base_url, &["api", "auth", "register"])?)
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        let response: TokenResponse = send_json(request, self.timeout).await?;
        BearerToken::new(response.token)
            .ok_or_else(|| RemoteError::Decode("empty token in register response".to_string()))
    }
}
