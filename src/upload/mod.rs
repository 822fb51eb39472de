//! Three-phase file upload and file record access.
//!
//! An upload is `init` (announce metadata, receive a storage address), a
//! direct transfer of the bytes to that address, then `complete` (receive the
//! finalized [`FileRecord`]). The phases are strictly ordered per file and
//! nothing is shared between independent uploads.

mod links;
mod progress;
mod transfer;
mod types;

use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use crate::api::{ApiClient, Target};
use crate::config::UploadConfig;
use crate::error::NormalizedError;
use crate::session::Notifier;
use crate::textutil::format_file_size;

pub use links::file_url;
pub use progress::{percent, ProgressStream};
pub use types::{FileMetadata, FileRecord, UploadFile, UploadOutcome, UploadSession};

use progress::ProgressReporter;
use types::{FileEnvelope, InitResponse};

pub const NO_FILE_MESSAGE: &str = "No file selected.";

/// Upload and file-record operations on the files backend.
#[derive(Clone)]
pub struct Uploader {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    max_file_size: u64,
}

impl Uploader {
    /// Build an uploader enforcing `config`'s size limit.
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, config: &UploadConfig) -> Self {
        Self {
            client,
            notifier,
            max_file_size: config.max_file_size_bytes,
        }
    }

    /// Client used for the backend requests.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Largest accepted file size in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Upload one file.
    ///
    /// A missing or oversized file is rejected locally: the notifier is told,
    /// the outcome is [`UploadOutcome::Rejected`] and no request is made.
    pub async fn upload(&self, file: Option<&UploadFile>) -> Result<UploadOutcome, NormalizedError> {
        let total = file.map(UploadFile::size).unwrap_or(0);
        self.run(file, ProgressReporter::silent(total)).await
    }

    /// Like [`upload`](Self::upload), also returning the transfer progress.
    ///
    /// The returned future must be polled for the stream to advance; the
    /// stream closes when the future resolves.
    pub fn upload_with_progress<'a>(
        &'a self,
        file: Option<&'a UploadFile>,
    ) -> (
        ProgressStream,
        impl Future<Output = Result<UploadOutcome, NormalizedError>> + 'a,
    ) {
        let total = file.map(UploadFile::size).unwrap_or(0);
        let (reporter, stream) = ProgressReporter::channel(total);
        (stream, self.run(file, reporter))
    }

    async fn run(
        &self,
        file: Option<&UploadFile>,
        progress: ProgressReporter,
    ) -> Result<UploadOutcome, NormalizedError> {
        let file = match self.check(file) {
            Ok(file) => file,
            Err(message) => {
                tracing::info!(%message, "upload rejected before transfer");
                self.notifier.error(&message);
                return Ok(UploadOutcome::Rejected { message });
            }
        };

        let session = self.init(file).await?;
        tracing::info!(
            upload_id = %session.upload_id,
            name = %file.name,
            size = file.size(),
            "upload initialized"
        );

        transfer::put_object(self.client.http(), &session.upload_url, file, &progress).await?;
        progress.finish();
        tracing::info!(upload_id = %session.upload_id, "upload transferred");

        let record = self.complete(&session).await?;
        tracing::info!(upload_id = %session.upload_id, file_id = %record.id, "upload completed");
        Ok(UploadOutcome::Completed(record))
    }

    fn check<'f>(&self, file: Option<&'f UploadFile>) -> Result<&'f UploadFile, String> {
        let file = file.ok_or_else(|| NO_FILE_MESSAGE.to_string())?;
        if file.size() > self.max_file_size {
            return Err(format!(
                "File is too large. Maximum size is {}.",
                format_file_size(self.max_file_size)
            ));
        }
        Ok(file)
    }

    /// Announce the upload and obtain its storage address.
    pub async fn init(&self, file: &UploadFile) -> Result<UploadSession, NormalizedError> {
        if self.client.auth().current_session().await.is_none() {
            return Err(NormalizedError::missing_credentials(
                "You must be signed in to upload files.",
            ));
        }
        let metadata = FileMetadata {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
        };
        let body = json!({
            "originalname": metadata.name,
            "mimetype": metadata.mime_type,
            "size": metadata.size,
        });
        let response = self
            .client
            .post(Target::Files, "/upload/init", Some(body))
            .await?;
        let init: InitResponse = response.json()?;
        Ok(UploadSession {
            upload_id: init.upload_id,
            upload_url: init.upload_url,
            file: metadata,
        })
    }

    /// Finalize a transferred upload.
    pub async fn complete(&self, session: &UploadSession) -> Result<FileRecord, NormalizedError> {
        let path = format!("/upload/complete/{}", path_segment(&session.upload_id)?);
        let envelope: FileEnvelope = self
            .client
            .post(Target::Files, &path, None)
            .await?
            .json()?;
        Ok(envelope.file)
    }

    /// Fetch a stored file record.
    pub async fn get_file(&self, file_id: &str) -> Result<FileRecord, NormalizedError> {
        let path = format!("/files/{}", path_segment(file_id)?);
        let envelope: FileEnvelope = self
            .client
            .get(Target::Files, &path)
            .await?
            .json()?;
        Ok(envelope.file)
    }

    /// Delete a stored file and return the backend's acknowledgment.
    pub async fn delete_file(&self, file_id: &str) -> Result<Value, NormalizedError> {
        let path = format!("/files/{}", path_segment(file_id)?);
        let response = self
            .client
            .delete(Target::Files, &path)
            .await?;
        tracing::info!(file_id, "file deleted");
        Ok(response.into_body())
    }

    /// Inline preview address for `filename`.
    pub async fn preview_url(&self, filename: &str, with_auth: bool) -> Result<String, NormalizedError> {
        self.link(filename, true, with_auth).await
    }

    /// Download address for `filename`.
    pub async fn download_url(&self, filename: &str, with_auth: bool) -> Result<String, NormalizedError> {
        self.link(filename, false, with_auth).await
    }

    async fn link(&self, filename: &str, for_preview: bool, with_auth: bool) -> Result<String, NormalizedError> {
        let session = if with_auth {
            self.client.auth().current_session().await
        } else {
            None
        };
        file_url(
            &self.client.backends().files_url,
            filename,
            for_preview,
            with_auth,
            session.as_ref(),
        )
    }
}

/// Percent-encode an identifier as exactly one path segment.
///
/// Dot segments would be collapsed by URL normalization, so they are refused.
fn path_segment(id: &str) -> Result<String, NormalizedError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(NormalizedError::validation(format!(
            "'{id}' is not a valid file identifier."
        )));
    }
    Ok(urlencoding::encode(id).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryConfig;
    use crate::config::BackendsConfig;
    use crate::error::ErrorKind;
    use crate::session::{AuthService, Session};
    use crate::testsupport::{MockResponse, MockServer, RecordingNotifier, ScriptedAuth};
    use std::time::Duration;

    const LIMIT: u64 = 1024;

    fn uploader(
        server: &MockServer,
        session: Option<Session>,
    ) -> (Uploader, Arc<ScriptedAuth>, Arc<RecordingNotifier>) {
        uploader_with(
            server,
            session,
            &UploadConfig {
                max_file_size_bytes: LIMIT,
            },
        )
    }

    fn uploader_with(
        server: &MockServer,
        session: Option<Session>,
        config: &UploadConfig,
    ) -> (Uploader, Arc<ScriptedAuth>, Arc<RecordingNotifier>) {
        let auth = Arc::new(ScriptedAuth::new(session));
        let notifier = Arc::new(RecordingNotifier::default());
        let backends = BackendsConfig {
            api_url: format!("{}/api-svc", server.base_url()),
            files_url: server.base_url().to_string(),
        };
        let retry = RetryConfig {
            max_retries: 1,
            initial_delay_ms: 5,
            max_delay_ms: 10,
            backoff_factor: 2.0,
        };
        let client =
            ApiClient::with_settings(backends, Duration::from_secs(2), retry, auth.clone());
        let uploader = Uploader::new(client, notifier.clone(), config);
        (uploader, auth, notifier)
    }

    fn signed_in() -> Option<Session> {
        Some(Session::new("tok-1", Some("sid-1".to_string())))
    }

    fn happy_script() -> Vec<MockResponse> {
        vec![
            MockResponse::json(
                200,
                json!({"uploadId": "up-1", "uploadUrl": "{base}/storage/up-1"}),
            ),
            MockResponse::status(200),
            MockResponse::json(
                200,
                json!({"file": {"_id": "f-1", "originalname": "notes.txt", "size": 300}}),
            ),
        ]
    }

    fn text_file(len: usize) -> UploadFile {
        UploadFile::new("notes.txt", "text/plain", vec![b'a'; len])
    }

    #[tokio::test]
    async fn upload_runs_three_phases_in_order() {
        let server = MockServer::start(happy_script()).await;
        let (uploader, _, notifier) = uploader(&server, signed_in());

        let outcome = uploader.upload(Some(&text_file(300))).await.unwrap();
        let record = outcome.into_result().unwrap();
        assert_eq!(record.id, "f-1");
        assert_eq!(record.original_name.as_deref(), Some("notes.txt"));

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/upload/init");
        assert_eq!(
            requests[0].json(),
            json!({"originalname": "notes.txt", "mimetype": "text/plain", "size": 300})
        );
        assert_eq!(requests[0].header("x-auth-token"), Some("tok-1"));

        assert_eq!(requests[1].method, "PUT");
        assert_eq!(requests[1].path, "/storage/up-1");
        assert_eq!(requests[1].header("content-type"), Some("text/plain"));
        assert_eq!(requests[1].header("content-length"), Some("300"));
        assert_eq!(requests[1].header("x-auth-token"), None);
        assert_eq!(requests[1].body.len(), 300);

        assert_eq!(requests[2].method, "POST");
        assert_eq!(requests[2].path, "/upload/complete/up-1");
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_100() {
        let server = MockServer::start(happy_script()).await;
        let (uploader, _, _) = uploader(&server, signed_in());
        let file = text_file(300);

        let (mut progress, upload) = uploader.upload_with_progress(Some(&file));
        let collect = async {
            let mut seen = Vec::new();
            while let Some(value) = progress.next().await {
                seen.push(value);
            }
            seen
        };
        let (outcome, seen) = tokio::join!(upload, collect);

        assert!(outcome.unwrap().is_success());
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn oversize_file_is_rejected_without_network() {
        let server = MockServer::start(happy_script()).await;
        let (uploader, _, notifier) = uploader(&server, signed_in());

        let outcome = uploader
            .upload(Some(&text_file(LIMIT as usize + 1)))
            .await
            .unwrap();
        let UploadOutcome::Rejected { message } = outcome else {
            panic!("expected rejection");
        };
        assert!(message.contains("1.00 KB"), "message: {message}");
        assert_eq!(notifier.messages(), vec![message]);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn file_at_limit_is_accepted() {
        let server = MockServer::start(happy_script()).await;
        let (uploader, _, _) = uploader(&server, signed_in());
        let outcome = uploader.upload(Some(&text_file(LIMIT as usize))).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn default_limit_is_fifty_mebibytes() {
        const FIFTY_MIB: usize = 50 * 1024 * 1024;
        let server = MockServer::start(Vec::new()).await;
        let (uploader, _, notifier) = uploader_with(&server, None, &UploadConfig::default());
        assert_eq!(uploader.max_file_size(), FIFTY_MIB as u64);

        // Passes the size check and stops at the session requirement.
        let at_limit = UploadFile::new("big.bin", "application/octet-stream", vec![0u8; FIFTY_MIB]);
        let err = uploader.upload(Some(&at_limit)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);

        let over = UploadFile::new(
            "big.bin",
            "application/octet-stream",
            vec![0u8; FIFTY_MIB + 1],
        );
        let outcome = uploader.upload(Some(&over)).await.unwrap();
        let UploadOutcome::Rejected { message } = outcome else {
            panic!("expected rejection");
        };
        assert!(message.contains("50.00 MB"), "message: {message}");
        assert_eq!(notifier.messages(), vec![message]);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let server = MockServer::start(Vec::new()).await;
        let (uploader, _, notifier) = uploader(&server, signed_in());

        let outcome = uploader.upload(None).await.unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Rejected {
                message: NO_FILE_MESSAGE.to_string()
            }
        );
        assert_eq!(notifier.messages(), vec![NO_FILE_MESSAGE.to_string()]);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn upload_without_session_needs_credentials() {
        let server = MockServer::start(happy_script()).await;
        let (uploader, _, _) = uploader(&server, None);

        let err = uploader.upload(Some(&text_file(10))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_transfer_skips_complete() {
        let server = MockServer::start(vec![
            MockResponse::json(
                200,
                json!({"uploadId": "up-2", "uploadUrl": "{base}/storage/up-2"}),
            ),
            MockResponse::json(503, json!({"message": "storage offline"})),
        ])
        .await;
        let (uploader, _, _) = uploader(&server, signed_in());

        let err = uploader.upload(Some(&text_file(10))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HttpError);
        assert_eq!(err.status(), 503);
        assert!(!err.is_replayable());
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn file_ids_stay_inside_one_path_segment() {
        let server = MockServer::start(vec![
            MockResponse::json(200, json!({"message": "File deleted"})),
            MockResponse::json(200, json!({"message": "File deleted"})),
            MockResponse::json(200, json!({"file": {"id": "a#b"}})),
        ])
        .await;
        let (uploader, _, _) = uploader(&server, signed_in());

        uploader.delete_file("../upload/complete/x").await.unwrap();
        uploader.delete_file("a?b=c").await.unwrap();
        uploader.get_file("a#b").await.unwrap();

        let paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/files/..%2Fupload%2Fcomplete%2Fx",
                "/files/a%3Fb%3Dc",
                "/files/a%23b",
            ]
        );
    }

    #[tokio::test]
    async fn dot_segment_ids_are_refused() {
        let server = MockServer::start(Vec::new()).await;
        let (uploader, _, _) = uploader(&server, signed_in());

        for id in ["", ".", ".."] {
            let err = uploader.delete_file(id).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "id {id:?}");
        }
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn get_and_delete_use_files_backend() {
        let server = MockServer::start(vec![
            MockResponse::json(200, json!({"file": {"id": "f-9", "mimetype": "image/png"}})),
            MockResponse::json(200, json!({"message": "File deleted"})),
        ])
        .await;
        let (uploader, _, _) = uploader(&server, signed_in());

        let record = uploader.get_file("f-9").await.unwrap();
        assert_eq!(record.id, "f-9");
        assert_eq!(record.mime_type.as_deref(), Some("image/png"));

        let ack = uploader.delete_file("f-9").await.unwrap();
        assert_eq!(ack, json!({"message": "File deleted"}));

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/files/f-9");
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].path, "/files/f-9");
    }

    #[tokio::test]
    async fn preview_link_reads_current_session() {
        let server = MockServer::start(Vec::new()).await;
        let (uploader, auth, _) = uploader(&server, signed_in());

        let url = uploader.preview_url("a.png", true).await.unwrap();
        assert!(url.contains("token=tok-1"));
        assert!(url.contains("sessionId=sid-1"));

        auth.logout().await;
        let err = uploader.preview_url("a.png", true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);

        let url = uploader.download_url("a.png", false).await.unwrap();
        assert!(url.ends_with("/api/files/download/a.png"));
    }
}
