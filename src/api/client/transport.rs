//! HTTP transport helpers for dispatched attempts.

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;

use crate::api::attempt::RequestAttempt;
use crate::api::outcome::{server_message, TransportCode, TransportFailure};
use crate::api::response::ApiResponse;
use crate::config::BackendsConfig;
use crate::session::Session;

pub(crate) const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-token");
pub(crate) const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Build an HTTP client with timeout applied.
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send one attempt and read its outcome.
pub(crate) async fn execute(
    http: &reqwest::Client,
    backends: &BackendsConfig,
    attempt: &RequestAttempt,
    session: Option<&Session>,
) -> Result<ApiResponse, TransportFailure> {
    let url = attempt.url(backends);
    tracing::debug!(
        method = %attempt.method(),
        %url,
        target = attempt.target().tag(),
        attempt = attempt.number(),
        authenticated = session.is_some(),
        "dispatching request"
    );

    let mut request = http.request(attempt.method().clone(), &url);
    if let Some(session) = session {
        request = with_session_headers(request, session);
    }
    if let Some(body) = attempt.wire_body() {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(TransportFailure::from_send_error)?;
    read_response(response).await
}

/// Attach session credentials as request headers.
pub(crate) fn with_session_headers(
    mut request: reqwest::RequestBuilder,
    session: &Session,
) -> reqwest::RequestBuilder {
    match HeaderValue::from_str(&session.token) {
        Ok(value) => request = request.header(AUTH_TOKEN_HEADER, value),
        Err(_) => tracing::warn!("session token is not a valid header value; sending without it"),
    }
    if let Some(session_id) = session.session_id() {
        match HeaderValue::from_str(session_id) {
            Ok(value) => request = request.header(SESSION_ID_HEADER, value),
            Err(_) => tracing::warn!("session id is not a valid header value; sending without it"),
        }
    }
    request
}

/// Convert a received response into a result.
pub(crate) async fn read_response(
    response: reqwest::Response,
) -> Result<ApiResponse, TransportFailure> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportFailure::Status {
            status: status.as_u16(),
            server_message: server_message(&body),
        });
    }

    let status = status.as_u16();
    // The connection can still drop while the body streams in.
    let bytes = response
        .bytes()
        .await
        .map_err(|err| TransportFailure::NoResponse {
            code: TransportCode::from_reqwest(&err),
            source: Some(err),
        })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiResponse {
            status,
            body: Value::Null,
        });
    }
    serde_json::from_slice(&bytes)
        .map(|body| ApiResponse { status, body })
        .map_err(|err| TransportFailure::InvalidBody {
            status,
            source: Some(err),
        })
}
