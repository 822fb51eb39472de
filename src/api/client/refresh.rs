//! Silent recovery of expired sessions.
//!
//! Runs at most once per failed logical request and never re-enters the retry
//! loop: either the refreshed credentials make one replay succeed, or the
//! session is torn down and the original 401 is surfaced.

use super::transport;
use super::ApiClient;
use crate::api::attempt::RequestAttempt;
use crate::api::classify::classify;
use crate::api::response::ApiResponse;
use crate::error::{ErrorKind, NormalizedError};
use crate::session::SessionEvent;

/// Refresh credentials and replay `attempt` exactly once.
pub(super) async fn recover_session(
    client: &ApiClient,
    attempt: &RequestAttempt,
    expired: NormalizedError,
) -> Result<ApiResponse, NormalizedError> {
    let auth = client.auth();
    if !auth.refresh_token().await {
        tracing::warn!("session refresh failed");
        return Err(invalidate_session(client, expired).await);
    }
    let Some(session) = auth.current_session().await else {
        tracing::warn!("session refresh reported success but no session is available");
        return Err(invalidate_session(client, expired).await);
    };

    let outcome = transport::execute(
        client.http(),
        client.backends(),
        attempt,
        Some(&session),
    )
    .await;
    match outcome {
        Ok(response) => {
            tracing::info!(path = attempt.path(), "session refreshed; request replayed");
            Ok(response)
        }
        Err(failure) => {
            let err = classify(failure);
            if err.kind() == ErrorKind::AuthExpired {
                tracing::warn!("refreshed session was rejected");
                return Err(invalidate_session(client, expired).await);
            }
            Err(err.with_replay(client.replay_for(attempt)))
        }
    }
}

async fn invalidate_session(client: &ApiClient, expired: NormalizedError) -> NormalizedError {
    client.auth().logout().await;
    // No subscribers is fine; the host may not listen.
    let _ = client.events().send(SessionEvent::Invalidated);
    expired
}
