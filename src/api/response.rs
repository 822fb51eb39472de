//! Successful dispatcher result.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ErrorKind, NormalizedError};

/// Parsed 2xx response. An empty body is `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body into a typed payload.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, NormalizedError> {
        serde_json::from_value(self.body.clone()).map_err(|err| {
            NormalizedError::new(
                ErrorKind::HttpError,
                "The server returned a response in an unexpected format.",
                self.status,
            )
            .with_cause(err)
        })
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}
