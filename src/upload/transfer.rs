//! Direct byte transfer to the storage address issued at init.

use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::convert::Infallible;

use super::progress::ProgressReporter;
use super::types::UploadFile;
use crate::api::{classify, server_message, TransportFailure};
use crate::error::NormalizedError;

/// Size of each body chunk handed to the HTTP stack.
pub(crate) const TRANSFER_CHUNK_BYTES: usize = 64 * 1024;

/// PUT the file bytes to `upload_url`.
///
/// Storage addresses are pre-authorized, so no session headers are sent and
/// no retry or session recovery applies. Only the status is inspected.
pub(crate) async fn put_object(
    http: &reqwest::Client,
    upload_url: &str,
    file: &UploadFile,
    progress: &ProgressReporter,
) -> Result<(), NormalizedError> {
    let total = file.size();
    let reporter = progress.clone();
    let chunks = stream::iter(split_chunks(&file.bytes)).map(move |chunk| {
        reporter.advance(chunk.len() as u64);
        Ok::<_, Infallible>(chunk)
    });

    let response = http
        .put(upload_url)
        .header(CONTENT_TYPE, file.mime_type.as_str())
        .header(CONTENT_LENGTH, total)
        .body(reqwest::Body::wrap_stream(chunks))
        .send()
        .await
        .map_err(|err| classify(TransportFailure::from_send_error(err)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(classify(TransportFailure::Status {
        status: status.as_u16(),
        server_message: server_message(&text),
    }))
}

fn split_chunks(bytes: &Bytes) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(TRANSFER_CHUNK_BYTES)
        .map(|start| bytes.slice(start..(start + TRANSFER_CHUNK_BYTES).min(bytes.len())))
        .collect()
}
