//! Raw transport outcomes before normalization.

use std::error::Error as StdError;
use std::io;

use crate::textutil::truncate_with_suffix_by_chars;

/// Transport-level failure codes for attempts that got no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCode {
    Timeout,
    DnsFailure,
    NetworkUnreachable,
    ConnectionAborted,
    NetworkError,
}

impl TransportCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "ETIMEDOUT",
            Self::DnsFailure => "ENOTFOUND",
            Self::NetworkUnreachable => "ENETUNREACH",
            Self::ConnectionAborted => "ECONNABORTED",
            Self::NetworkError => "ERR_NETWORK",
        }
    }

    /// Best-effort code for a reqwest failure.
    pub fn from_reqwest(err: &reqwest::Error) -> Option<Self> {
        if err.is_timeout() {
            return Some(Self::Timeout);
        }
        if let Some(kind) = io_error_kind(err) {
            match kind {
                io::ErrorKind::TimedOut => return Some(Self::Timeout),
                io::ErrorKind::ConnectionAborted
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return Some(Self::ConnectionAborted),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                    return Some(Self::NetworkUnreachable)
                }
                _ => {}
            }
        }
        if err.is_connect() {
            if mentions_dns(err) {
                return Some(Self::DnsFailure);
            }
            return Some(Self::NetworkUnreachable);
        }
        if err.is_request() || err.is_body() {
            return Some(Self::NetworkError);
        }
        None
    }
}

/// Failure of one attempt as seen by the transport.
#[derive(Debug)]
pub enum TransportFailure {
    /// The request went out but nothing came back.
    NoResponse {
        code: Option<TransportCode>,
        source: Option<reqwest::Error>,
    },
    /// The request never left the client (bad URL, builder failure).
    NotSent { source: Option<reqwest::Error> },
    /// The server answered with a non-2xx status.
    Status {
        status: u16,
        server_message: Option<String>,
    },
    /// The server answered 2xx with a body that is not JSON.
    InvalidBody {
        status: u16,
        source: Option<serde_json::Error>,
    },
}

impl TransportFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::InvalidBody { status, .. } => Some(*status),
            Self::NoResponse { .. } | Self::NotSent { .. } => None,
        }
    }

    pub(crate) fn from_send_error(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::NotSent { source: Some(err) };
        }
        Self::NoResponse {
            code: TransportCode::from_reqwest(&err),
            source: Some(err),
        }
    }
}

/// Longest server-provided message surfaced to callers.
const MAX_SERVER_MESSAGE_CHARS: usize = 300;

/// Pull a server-provided message out of an error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"].iter().find_map(|field| {
        value
            .get(*field)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| truncate_with_suffix_by_chars(text, MAX_SERVER_MESSAGE_CHARS, "..."))
    })
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = inner.source();
    }
    None
}

fn mentions_dns(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(inner) = source {
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}
