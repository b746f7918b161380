use async_trait::async_trait;

use crate::{HttpRequest, HttpResponse, Result};

/// Sends built requests to the embedding service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns a short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Performs one request/response round trip.
    ///
    /// Any HTTP status is returned as a response; only failures to obtain a
    /// response at all are errors.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the connection fails or the body cannot
    /// be read.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
