//! Retry policy utilities for dispatched requests.

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use super::outcome::{TransportCode, TransportFailure};

/// HTTP statuses treated as transient. 401 goes through session recovery
/// instead.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Transport codes treated as transient.
pub const RETRYABLE_TRANSPORT_CODES: [TransportCode; 5] = [
    TransportCode::Timeout,
    TransportCode::DnsFailure,
    TransportCode::NetworkUnreachable,
    TransportCode::ConnectionAborted,
    TransportCode::NetworkError,
];

/// Upper bound of the multiplicative jitter term.
const MAX_JITTER: f64 = 0.1;

/// Backoff settings, read-only once the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Bounded retry policy used by `ApiClient`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Whether the failure is transient.
    pub fn is_retryable(&self, failure: &TransportFailure) -> bool {
        match failure {
            TransportFailure::NoResponse { code, .. } => match code {
                Some(code) => RETRYABLE_TRANSPORT_CODES.contains(code),
                // Sent but unanswered: still a network failure.
                None => true,
            },
            TransportFailure::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            TransportFailure::NotSent { .. } | TransportFailure::InvalidBody { .. } => false,
        }
    }

    /// Whether attempt `attempt` may be followed by another one.
    pub fn should_retry(&self, failure: &TransportFailure, attempt: u32) -> bool {
        attempt < self.config.max_retries && self.is_retryable(failure)
    }

    /// Delay before the attempt after `attempt`.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER);
        self.delay_with_jitter(attempt, jitter)
    }

    pub(crate) fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.config.initial_delay_ms as f64 * self.config.backoff_factor.powi(exponent);
        let millis = (base * (1.0 + jitter.clamp(0.0, MAX_JITTER)))
            .min(self.config.max_delay_ms as f64)
            .max(0.0);
        Duration::from_millis(millis.round() as u64)
    }
}
