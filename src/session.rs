//! Session model and the collaborators the access layer consumes.
//!
//! Credential storage and the actual token-refresh exchange live outside this
//! crate; the client only talks to them through [`AuthService`]. User-facing
//! notifications go through [`Notifier`], and unrecoverable authentication
//! failures are announced as a [`SessionEvent`] the host subscribes to.

use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// Authenticated-user credentials attached to outbound requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub session_id: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            session_id,
        }
    }

    /// Session id when present and non-blank.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// External authentication capability.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Current session, if the user is signed in.
    async fn current_session(&self) -> Option<Session>;
    /// Try to obtain fresh credentials. Returns `true` on success.
    async fn refresh_token(&self) -> bool;
    /// Drop local credentials.
    async fn logout(&self);
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Signals emitted to the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Recovery failed and credentials were discarded; the host should route
    /// the user to re-authentication.
    Invalidated,
}

/// Session provider backed by a fixed credential pair.
///
/// It has no way to refresh, so refresh always reports failure. Logout clears
/// the held session.
#[derive(Debug, Default)]
pub struct StaticAuthService {
    session: RwLock<Option<Session>>,
}

impl StaticAuthService {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    /// Build from raw config values; a blank token means signed out.
    pub fn from_parts(token: &str, session_id: Option<&str>) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return Self::new(None);
        }
        Self::new(Some(Session::new(token, session_id.map(str::to_string))))
    }
}

#[async_trait]
impl AuthService for StaticAuthService {
    async fn current_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh_token(&self) -> bool {
        tracing::debug!("static session provider cannot refresh credentials");
        false
    }

    async fn logout(&self) {
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Notifier that routes messages into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(%message, "user notification");
    }
}
