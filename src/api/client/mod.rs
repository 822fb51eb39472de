//! Request dispatcher for the logical backends.
//!
//! The client facade here intentionally remains small:
//! - wire dispatch is delegated to `transport`.
//! - session recovery is delegated to `refresh`.
//! - concurrent-request bookkeeping is delegated to `inflight`.

mod inflight;
mod refresh;
pub(crate) mod transport;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

use super::attempt::RequestAttempt;
use super::classify::classify;
use super::response::ApiResponse;
use super::retry::{RetryConfig, RetryPolicy};
use super::target::Target;
use crate::config::{BackendsConfig, Config};
use crate::error::{ErrorKind, NormalizedError};
use crate::session::{AuthService, SessionEvent};
use inflight::InFlightRegistry;

/// Session events buffered for slow subscribers.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Client for the configured backends.
///
/// Cheap to clone; clones share the HTTP pool, the session provider and the
/// event channel. Construct one at the application root and pass it down.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    backends: BackendsConfig,
    retry_policy: RetryPolicy,
    auth: Arc<dyn AuthService>,
    events: broadcast::Sender<SessionEvent>,
    in_flight: InFlightRegistry,
}

impl ApiClient {
    /// Build a client from resolved configuration.
    pub fn new(config: &Config, auth: Arc<dyn AuthService>) -> Self {
        Self::with_settings(
            config.backends.clone(),
            config.network.request_timeout(),
            config.retry,
            auth,
        )
    }

    /// Build a client from explicit settings.
    pub fn with_settings(
        backends: BackendsConfig,
        timeout: Duration,
        retry: RetryConfig,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                http: transport::build_http_client(timeout),
                backends,
                retry_policy: RetryPolicy::new(retry),
                auth,
                events,
                in_flight: InFlightRegistry::default(),
            }),
        }
    }

    /// Base addresses of the backend targets.
    pub fn backends(&self) -> &BackendsConfig {
        &self.inner.backends
    }

    /// Session provider consulted on every attempt.
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.inner.auth
    }

    /// Backoff policy applied to transient failures.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Subscribe to session lifecycle signals.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Number of logical requests currently running under `METHOD:url`.
    pub fn in_flight(&self, key: &str) -> usize {
        self.inner.in_flight.count(key)
    }

    /// Shared HTTP connection pool.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn events(&self) -> &broadcast::Sender<SessionEvent> {
        &self.inner.events
    }

    /// Dispatch a `GET` to `target`.
    pub async fn get(&self, target: Target, path: &str) -> Result<ApiResponse, NormalizedError> {
        self.dispatch(RequestAttempt::get(path).with_target(target))
            .await
    }

    /// Dispatch a `POST` to `target`; `None` sends `{}`.
    pub async fn post(
        &self,
        target: Target,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, NormalizedError> {
        let mut attempt = RequestAttempt::post(path).with_target(target);
        if let Some(body) = body {
            attempt = attempt.with_json(body);
        }
        self.dispatch(attempt).await
    }

    /// Dispatch a `DELETE` to `target`.
    pub async fn delete(
        &self,
        target: Target,
        path: &str,
    ) -> Result<ApiResponse, NormalizedError> {
        self.dispatch(RequestAttempt::delete(path).with_target(target))
            .await
    }

    /// Run one logical request to a terminal state.
    ///
    /// Transient failures are retried with backoff up to `max_retries`; a 401
    /// goes through one session-recovery attempt; anything else surfaces as a
    /// replayable [`NormalizedError`].
    pub async fn dispatch(&self, request: RequestAttempt) -> Result<ApiResponse, NormalizedError> {
        let original = request.first();
        let _in_flight = self
            .inner
            .in_flight
            .enter(original.key(&self.inner.backends));
        let policy = &self.inner.retry_policy;

        let mut attempt = original.clone();
        loop {
            let session = self.inner.auth.current_session().await;
            let failure = match transport::execute(
                &self.inner.http,
                &self.inner.backends,
                &attempt,
                session.as_ref(),
            )
            .await
            {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if policy.should_retry(&failure, attempt.number()) {
                let delay = policy.compute_delay(attempt.number());
                tracing::warn!(
                    method = %attempt.method(),
                    path = attempt.path(),
                    attempt = attempt.number(),
                    status = failure.status().unwrap_or(0),
                    delay_ms = delay.as_millis() as u64,
                    "transient failure; retrying"
                );
                sleep(delay).await;
                attempt = attempt.next();
                continue;
            }

            let err = classify(failure).with_replay(self.replay_for(&original));
            if err.kind() == ErrorKind::AuthExpired {
                return refresh::recover_session(self, &attempt, err).await;
            }
            tracing::debug!(
                method = %attempt.method(),
                path = attempt.path(),
                attempt = attempt.number(),
                kind = %err.kind(),
                "request failed"
            );
            return Err(err);
        }
    }

    pub(crate) fn replay_for(&self, attempt: &RequestAttempt) -> Replay {
        Replay {
            client: self.clone(),
            attempt: attempt.first(),
        }
    }
}

/// Captured request that a caller can re-issue after a terminal failure.
pub(crate) struct Replay {
    client: ApiClient,
    attempt: RequestAttempt,
}

impl Replay {
    pub(crate) async fn run(&self) -> Result<ApiResponse, NormalizedError> {
        self.client.dispatch(self.attempt.clone()).await
    }
}
