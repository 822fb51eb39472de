//! Immutable per-attempt request description.

use reqwest::Method;
use serde_json::Value;

use super::target::Target;
use crate::config::BackendsConfig;

/// One attempt of a logical request.
///
/// Retries never mutate an attempt in place: [`RequestAttempt::next`] derives
/// attempt `N + 1` from attempt `N`, so concurrent logical requests never share
/// retry state.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    method: Method,
    path: String,
    target: Target,
    body: Option<Value>,
    number: u32,
}

impl RequestAttempt {
    /// First attempt of a request to `path` on the primary backend.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            target: Target::default(),
            body: None,
            number: 0,
        }
    }

    /// `GET` without a body.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST`; sends `{}` unless a body is set.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `DELETE`; sends `{}` unless a body is set.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Address the request to another backend.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the JSON request body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the target's base address.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Backend the request is addressed to.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Zero-based attempt counter.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Absolute URL for this attempt against the configured backends.
    pub fn url(&self, backends: &BackendsConfig) -> String {
        join_url(self.target.base_url(backends), &self.path)
    }

    /// Registry key shared by identical requests.
    pub fn key(&self, backends: &BackendsConfig) -> String {
        format!("{}:{}", self.method, self.url(backends))
    }

    /// Body to put on the wire. Mutating methods always carry one.
    pub fn wire_body(&self) -> Option<Value> {
        if self.method == Method::GET {
            return self.body.clone();
        }
        Some(
            self.body
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        )
    }

    /// The attempt after this one, identical apart from its number.
    pub(crate) fn next(&self) -> Self {
        Self {
            number: self.number.saturating_add(1),
            ..self.clone()
        }
    }

    /// The same request as a fresh first attempt.
    pub(crate) fn first(&self) -> Self {
        Self {
            number: 0,
            ..self.clone()
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
