//! Upload payloads and backend records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::NormalizedError;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// File selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its mime type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Metadata announced to the backend at init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// Server-issued handle for one in-progress upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_id: String,
    pub upload_url: String,
    pub file: FileMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitResponse {
    pub(super) upload_id: String,
    pub(super) upload_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileEnvelope {
    pub(super) file: FileRecord,
}

/// Finalized file as stored by the backend.
///
/// Unknown fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(
        default,
        alias = "originalname",
        alias = "originalName",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_name: Option<String>,
    #[serde(
        default,
        alias = "mimetype",
        alias = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of [`Uploader::upload`](super::Uploader::upload).
///
/// Rejection by the local pre-check is a value, not an error: it never
/// reaches the network.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed(FileRecord),
    Rejected { message: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Fold a rejection into a `Validation` error.
    pub fn into_result(self) -> Result<FileRecord, NormalizedError> {
        match self {
            Self::Completed(record) => Ok(record),
            Self::Rejected { message } => Err(NormalizedError::validation(message)),
        }
    }
}
