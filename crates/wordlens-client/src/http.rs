use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use wordlens_core::{Error, HttpMethod, HttpRequest, HttpResponse, Result, Transport};

/// Transport that performs real HTTP requests.
pub struct HttpTransport {
    /// HTTP client for API requests.
    client: Client,
}

impl HttpTransport {
    /// Creates a transport, applying `timeout` to every request when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| Error::Transport(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { client })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: Client::default(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url),
            HttpMethod::Post => self.client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::Transport(format!("Request failed: {err}")))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(format!("Failed to read response body: {err}")))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
