//! Resilient HTTP access layer.
//!
//! The layer is split into cohesive modules:
//! - `attempt` / `target`: immutable request description and backend selection
//! - `retry`: transient-failure detection and backoff
//! - `outcome` / `classify`: raw transport failures and their normalization
//! - `client`: dispatch loop, session recovery and in-flight tracking

mod attempt;
mod classify;
mod client;
mod outcome;
mod response;
mod retry;
mod target;

pub use attempt::RequestAttempt;
pub use classify::{classify, status_message};
pub use client::ApiClient;
pub(crate) use client::Replay;
pub use outcome::{TransportCode, TransportFailure};
pub use response::ApiResponse;
pub use retry::{RetryConfig, RetryPolicy, RETRYABLE_STATUSES, RETRYABLE_TRANSPORT_CODES};
pub use target::Target;

pub(crate) use outcome::server_message;
