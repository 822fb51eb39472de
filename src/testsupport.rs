//! Shared test fixtures for dispatcher and upload test modules.
//!
//! `MockServer` is a scripted HTTP/1.1 server on a local port: each accepted
//! connection consumes the next scripted response and is closed afterwards.
//! Every request is recorded so tests can assert counts, order and headers.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::session::{AuthService, Notifier, Session};

/// Placeholder replaced with the server base URL in scripted bodies.
pub const BASE_URL_PLACEHOLDER: &str = "{base}";

/// One request as received by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

/// Scripted reply for one connection.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Reply {
        status: u16,
        content_type: &'static str,
        body: String,
    },
    /// Read the request and never answer.
    Stall,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::Reply {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Reply {
            status,
            content_type: "application/json",
            body: String::new(),
        }
    }

    pub fn stall() -> Self {
        Self::Stall
    }
}

/// Local scripted HTTP server; aborted on drop.
pub struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(script: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let base_url = format!("http://{addr}");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn(serve(
            listener,
            script,
            base_url.clone(),
            Arc::clone(&requests),
        ));
        Self {
            base_url,
            requests,
            task,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    script: Vec<MockResponse>,
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut script = script.into_iter();
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let Some(request) = read_request(&mut stream).await else {
            continue;
        };
        requests.lock().expect("requests lock").push(request);

        let reply = script.next().unwrap_or_else(|| {
            MockResponse::json(500, serde_json::json!({"message": "unexpected request"}))
        });
        match reply {
            MockResponse::Stall => {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    drop(stream);
                });
            }
            MockResponse::Reply {
                status,
                content_type,
                body,
            } => {
                let body = body.replace(BASE_URL_PLACEHOLDER, &base_url);
                let response = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Session provider with a scripted refresh outcome and call counters.
#[derive(Debug, Default)]
pub struct ScriptedAuth {
    session: Mutex<Option<Session>>,
    refreshed: Mutex<Option<Session>>,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl ScriptedAuth {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: Mutex::new(session),
            ..Self::default()
        }
    }

    /// Session installed by the next refresh; `None` makes refresh fail.
    pub fn refresh_to(&self, session: Option<Session>) {
        *self.refreshed.lock().expect("refresh lock") = session;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthService for ScriptedAuth {
    async fn current_session(&self) -> Option<Session> {
        self.session.lock().expect("session lock").clone()
    }

    async fn refresh_token(&self) -> bool {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match self.refreshed.lock().expect("refresh lock").clone() {
            Some(session) => {
                *self.session.lock().expect("session lock") = Some(session);
                true
            }
            None => false,
        }
    }

    async fn logout(&self) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().expect("session lock") = None;
    }
}

/// Notifier that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("notifier lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier lock")
            .push(message.to_string());
    }
}
