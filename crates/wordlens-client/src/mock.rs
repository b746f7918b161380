//! Mock transport for testing client flows.
//!
//! Serves canned responses per endpoint path, enabling end-to-end testing of
//! the client and session without a running service.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::Value;
use wordlens_core::{Error, HttpRequest, HttpResponse, IgnoreLock as _, Result, Transport};

/// What the mock does for a path.
#[derive(Debug, Clone)]
enum Reply {
    /// Answer with a response.
    Respond(HttpResponse),
    /// Fail as if the connection broke.
    Fail(String),
}

/// Reply storage type
type ReplyMap = Arc<Mutex<HashMap<String, Reply>>>;

/// Transport that answers from canned responses and records every request.
///
/// Paths without a canned reply answer `404`.
#[derive(Clone, Default)]
pub struct MockTransport {
    /// Replies keyed by URL path.
    replies: ReplyMap,
    /// Requests in the order they were sent.
    history: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with the given status and body.
    #[must_use]
    pub fn with_response(self, path: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.set_reply(path.into(), Reply::Respond(HttpResponse::new(status, body)));
        self
    }

    /// Answer `path` with `200` and a JSON body.
    #[must_use]
    pub fn with_json(self, path: impl Into<String>, body: &Value) -> Self {
        self.with_response(path, 200, body.to_string())
    }

    /// Fail every request to `path` with a transport error.
    #[must_use]
    pub fn with_failure(self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.set_reply(path.into(), Reply::Fail(message.into()));
        self
    }

    /// Replace the reply for `path` on a shared mock.
    pub fn set_json(&self, path: impl Into<String>, body: &Value) {
        self.set_reply(
            path.into(),
            Reply::Respond(HttpResponse::new(200, body.to_string())),
        );
    }

    /// Replace the status for `path` on a shared mock.
    pub fn set_status(&self, path: impl Into<String>, status: u16) {
        self.set_reply(path.into(), Reply::Respond(HttpResponse::new(status, "")));
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.history.lock_ignore_poison().clone()
    }

    /// Requests sent to a given path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.path() == path)
            .collect()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.history.lock_ignore_poison().len()
    }

    fn set_reply(&self, path: String, reply: Reply) {
        self.replies.lock_ignore_poison().insert(path, reply);
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let reply = self
            .replies
            .lock_ignore_poison()
            .get(request.url.path())
            .cloned();
        self.history.lock_ignore_poison().push(request);

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(Error::Transport(message)),
            None => Ok(HttpResponse::new(404, "not found")),
        }
    }
}

/// Encodes a blank PNG of the given size as base64, as the service would.
///
/// # Errors
///
/// Returns `Error::Decode` if PNG encoding fails.
pub fn sample_png_base64(width: u32, height: u32) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|err| Error::Decode(format!("Failed to encode sample PNG: {err}")))?;
    Ok(STANDARD.encode(buffer.into_inner()))
}
