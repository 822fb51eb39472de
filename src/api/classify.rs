//! Map terminal transport failures onto the normalized error taxonomy.

use super::outcome::TransportFailure;
use crate::error::{ErrorKind, NormalizedError};

const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Unable to reach the server. Check your network connection and try again.";
const NOT_SENT_MESSAGE: &str = "The request could not be sent.";
const INVALID_BODY_MESSAGE: &str = "The server returned a response that could not be read.";

/// Produce exactly one normalized error for a failed attempt.
///
/// The result never carries a replay capability; the dispatcher attaches one.
pub fn classify(failure: TransportFailure) -> NormalizedError {
    match failure {
        TransportFailure::NoResponse { code, source } => {
            let message = match code {
                Some(code) => format!("{NETWORK_UNREACHABLE_MESSAGE} ({})", code.as_str()),
                None => NETWORK_UNREACHABLE_MESSAGE.to_string(),
            };
            let mut err = NormalizedError::new(ErrorKind::NetworkUnreachable, message, 0);
            if let Some(code) = code {
                err = err.with_code(code.as_str());
            }
            attach_cause(err, source)
        }
        TransportFailure::NotSent { source } => attach_cause(
            NormalizedError::new(ErrorKind::NetworkUnreachable, NOT_SENT_MESSAGE, 0),
            source,
        ),
        TransportFailure::Status {
            status,
            server_message,
        } => {
            let kind = if status == 401 {
                ErrorKind::AuthExpired
            } else {
                ErrorKind::HttpError
            };
            NormalizedError::new(kind, status_message(status, server_message), status)
        }
        TransportFailure::InvalidBody { status, source } => attach_cause(
            NormalizedError::new(ErrorKind::HttpError, INVALID_BODY_MESSAGE, status),
            source,
        ),
    }
}

/// User-facing message for an HTTP failure status.
pub fn status_message(status: u16, server_message: Option<String>) -> String {
    match status {
        400 => server_message
            .unwrap_or_else(|| "The request was rejected because it failed validation.".into()),
        401 => "Authentication is required or your session has expired.".into(),
        403 => "You do not have permission to perform this action.".into(),
        404 => "The requested resource was not found.".into(),
        408 => "The request timed out. Please try again.".into(),
        429 => "Too many requests. Please wait a moment and try again.".into(),
        500 => "The server encountered an internal error.".into(),
        502..=504 => "The service is temporarily unavailable. Please try again later.".into(),
        _ => server_message
            .unwrap_or_else(|| format!("The server returned an unexpected error (status {status}).")),
    }
}

fn attach_cause<E>(err: NormalizedError, source: Option<E>) -> NormalizedError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match source {
        Some(source) => err.with_cause(source),
        None => err,
    }
}
