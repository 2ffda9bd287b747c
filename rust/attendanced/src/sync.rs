//! Whole-roster exchange with the spreadsheet web app.
//!
//! The backend only knows two operations: hand out the full roster (GET) and
//! overwrite it with a full roster (POST). There is no versioning, so two
//! clients saving over each other means the last one wins.

use crate::model::StudentAttendance;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const GENERIC_PROTOCOL_MESSAGE: &str = "backend returned a response that is not valid JSON";
const UNKNOWN_BACKEND_ERROR: &str = "backend reported an unknown error";

/// The backend is an Apps Script deployment, which only reads POST bodies
/// reliably when they are declared as plain text.
pub const SAVE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Raw HTTP exchange result, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Moves bytes to and from the backend endpoint.
///
/// Production goes through [`ReqwestTransport`]; tests swap in canned
/// responses.
pub trait SheetTransport: Send + Sync {
    fn endpoint(&self) -> &str;

    /// `GET` the endpoint. Errors only when no HTTP response was received.
    fn fetch(&self) -> anyhow::Result<HttpResponse>;

    /// `POST` `body` to the endpoint as [`SAVE_CONTENT_TYPE`].
    fn push(&self, body: String) -> anyhow::Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl ReqwestTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl SheetTransport for ReqwestTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fetch(&self) -> anyhow::Result<HttpResponse> {
        log::debug!("GET {}", self.endpoint);
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .with_context(|| format!("request to {} failed", self.endpoint))?;
        let status = resp.status().as_u16();
        let body = resp.text().context("failed to read response body")?;
        Ok(HttpResponse { status, body })
    }

    fn push(&self, body: String) -> anyhow::Result<HttpResponse> {
        log::debug!("POST {} ({} bytes)", self.endpoint, body.len());
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, SAVE_CONTENT_TYPE)
            .body(body)
            .send()
            .with_context(|| format!("request to {} failed", self.endpoint))?;
        let status = resp.status().as_u16();
        let body = resp.text().context("failed to read response body")?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The backend could not be reached or answered with a non-success status.
    #[error("transport error: {message}")]
    Transport { message: String, status: Option<u16> },
    /// The backend answered, but not with what was expected, or it reported
    /// an application error.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Transport { .. } => "transport_error",
            SyncError::Protocol { .. } => "protocol_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SyncError::Transport { message, .. } | SyncError::Protocol { message } => message,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            SyncError::Transport { status, .. } => *status,
            SyncError::Protocol { .. } => None,
        }
    }
}

/// Backend acknowledgement of a save, passed through as received.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SaveAck {
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn SheetTransport>,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn SheetTransport>) -> Self {
        Self { transport }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn load(&self) -> Result<Vec<StudentAttendance>, SyncError> {
        let resp = self.transport.fetch().map_err(transport_failure)?;
        let payload = open_envelope(resp)?;
        let students: Vec<StudentAttendance> =
            serde_json::from_value(payload).map_err(|e| SyncError::Protocol {
                message: format!("unexpected roster payload: {}", e),
            })?;
        log::info!(
            "loaded {} students from {}",
            students.len(),
            self.transport.endpoint()
        );
        Ok(students)
    }

    pub fn save(&self, students: &[Arc<StudentAttendance>]) -> Result<SaveAck, SyncError> {
        let body = serde_json::to_string(students).map_err(|e| SyncError::Protocol {
            message: format!("failed to encode roster: {}", e),
        })?;
        let resp = self.transport.push(body).map_err(transport_failure)?;
        let payload = open_envelope(resp)?;
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };
        let ack = SaveAck {
            status: text("status"),
            message: text("message"),
        };
        log::info!(
            "saved {} students to {} (status {:?})",
            students.len(),
            self.transport.endpoint(),
            ack.status
        );
        Ok(ack)
    }
}

fn transport_failure(e: anyhow::Error) -> SyncError {
    SyncError::Transport {
        message: format!("{:#}", e),
        status: None,
    }
}

/// Checks HTTP status and the `{status: "error", message}` envelope the
/// backend uses for application failures, which it sends with HTTP 200.
fn open_envelope(resp: HttpResponse) -> Result<serde_json::Value, SyncError> {
    if !(200..300).contains(&resp.status) {
        log::warn!("backend returned HTTP {}: {}", resp.status, resp.body);
        return Err(SyncError::Transport {
            message: format!("backend returned HTTP {}", resp.status),
            status: Some(resp.status),
        });
    }
    let payload: serde_json::Value = serde_json::from_str(&resp.body).map_err(|_| {
        log::warn!("unparseable backend response: {}", resp.body);
        SyncError::Protocol {
            message: GENERIC_PROTOCOL_MESSAGE.to_string(),
        }
    })?;
    if payload.get("status").and_then(|v| v.as_str()) == Some("error") {
        let message = payload
            .get("message")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_BACKEND_ERROR);
        return Err(SyncError::Protocol {
            message: message.to_string(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
pub mod testing {
    use super::{HttpResponse, SheetTransport};
    use std::sync::Mutex;

    /// Serves fixed responses and keeps every pushed body.
    pub struct CannedTransport {
        pub fetch_reply: Result<HttpResponse, String>,
        pub push_reply: Result<HttpResponse, String>,
        pub pushed: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        pub fn ok(fetch_body: &str, push_body: &str) -> Self {
            Self {
                fetch_reply: Ok(HttpResponse {
                    status: 200,
                    body: fetch_body.to_string(),
                }),
                push_reply: Ok(HttpResponse {
                    status: 200,
                    body: push_body.to_string(),
                }),
                pushed: Mutex::new(Vec::new()),
            }
        }
    }

    impl SheetTransport for CannedTransport {
        fn endpoint(&self) -> &str {
            "canned://sheet"
        }

        fn fetch(&self) -> anyhow::Result<HttpResponse> {
            self.fetch_reply.clone().map_err(anyhow::Error::msg)
        }

        fn push(&self, body: String) -> anyhow::Result<HttpResponse> {
            self.pushed.lock().expect("pushed lock").push(body);
            self.push_reply.clone().map_err(anyhow::Error::msg)
        }
    }
}
