//! Unified error types for the access layer.

use std::fmt;

use crate::api::{ApiResponse, Replay};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// NormalizedError
// ---------------------------------------------------------------------------

/// Stable failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local pre-check failed before any network call.
    Validation,
    /// The operation requires a session and none is available.
    MissingCredentials,
    /// No response was received from the server.
    NetworkUnreachable,
    /// The server answered with a failure status other than 401.
    HttpError,
    /// The server answered 401.
    AuthExpired,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::MissingCredentials => "missing-credentials",
            Self::NetworkUnreachable => "network-unreachable",
            Self::HttpError => "http-error",
            Self::AuthExpired => "auth-expired",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failure of one logical request.
///
/// `status` is `0` for transport-level failures. Errors produced by the
/// dispatcher carry the original request so callers can [`replay`] it.
///
/// [`replay`]: NormalizedError::replay
pub struct NormalizedError {
    kind: ErrorKind,
    message: String,
    status: u16,
    code: Option<String>,
    cause: Option<BoxError>,
    replay: Option<Replay>,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            code: None,
            cause: None,
            replay: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, 0)
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingCredentials, message, 0)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    pub(crate) fn with_replay(mut self, replay: Replay) -> Self {
        self.replay = Some(replay);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_replayable(&self) -> bool {
        self.replay.is_some()
    }

    /// Re-issue the original request through the dispatcher, with a fresh
    /// retry budget.
    pub async fn replay(&self) -> Result<ApiResponse, NormalizedError> {
        match &self.replay {
            Some(replay) => replay.run().await,
            None => Err(NormalizedError::new(
                self.kind,
                format!("{} (this failure cannot be replayed)", self.message),
                self.status,
            )),
        }
    }
}

impl fmt::Debug for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("status", &self.status)
            .field("code", &self.code)
            .field("cause", &self.cause)
            .field("replayable", &self.replay.is_some())
            .finish()
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == 0 {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{} (status {}): {}", self.kind, self.status, self.message)
        }
    }
}

impl std::error::Error for NormalizedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
