use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, from_slice, to_vec};
use wordlens_core::{
    ClientConfig, Credential, EmbeddingResult, Error, HttpRequest, NearestResult, NeighborResult,
    Query, Result, Transport,
};

use crate::http::HttpTransport;
use crate::images::{BulkImages, DecodePolicy, ImageResult, decode_batch};

/// Nearest-neighbor endpoint; also echoes the query embeddings.
pub const NEAREST_PATH: &str = "/api/nearest.php";
/// Single image endpoint.
pub const IMAGE_PATH: &str = "/api/image.php";
/// Bulk image endpoint.
pub const BULK_IMAGE_PATH: &str = "/api/bulk_image.php";
/// Header carrying the API key on `GET` endpoints.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Body of a nearest-neighbor response.
#[derive(Debug, Deserialize)]
struct NearestResponse {
    /// Embeddings of the query words.
    input: EmbeddingResult,
    /// Neighbor list, absent when the service found nothing.
    #[serde(default)]
    nearest: Vec<NeighborResult>,
}

/// Body of a single image response.
#[derive(Debug, Deserialize)]
struct ImageResponse {
    /// Word the image was chosen for.
    label: String,
    /// Base64-encoded image bytes.
    image_base64: String,
}

/// Client for the embedding service endpoints.
#[derive(Clone)]
pub struct ApiClient {
    /// Transport used for every request.
    transport: Arc<dyn Transport>,
    /// Scheme, host and optional path prefix of the service.
    base_url: Url,
    /// API key sent with every request.
    credential: Credential,
}

impl ApiClient {
    /// Creates a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, credential: Credential) -> Self {
        Self {
            transport,
            base_url,
            credential,
        }
    }

    /// Creates an HTTP client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, credential: Credential) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::new(Arc::new(transport), config.base_url()?, credential))
    }

    /// Replaces the API key.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// API key in use.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Fetches the embeddings of the query words.
    ///
    /// # Errors
    ///
    /// `InvalidInput` without a key, `Transport`/`Server` on request failure,
    /// `Decode` on a malformed body or mismatched embedding count.
    pub async fn fetch_embeddings(&self, query: &Query) -> Result<EmbeddingResult> {
        let key = self.api_key()?;
        let text = query.text();
        let url = self.endpoint(NEAREST_PATH, &[("words", text.as_str())])?;
        let request = HttpRequest::get(url).with_header(API_KEY_HEADER, key);

        let body = self.execute(request).await?;
        let response: NearestResponse = from_slice(&body)?;
        response.input.validate()?;

        tracing::debug!(
            words = response.input.words.len(),
            dimensions = response.input.dimensions(),
            "fetched embeddings"
        );
        Ok(response.input)
    }

    /// Fetches the query embeddings and up to `query.limit()` neighbors.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_embeddings`], plus `EmptyResult` when the service
    /// returns no neighbors.
    pub async fn fetch_nearest(&self, query: &Query) -> Result<NearestResult> {
        let key = self.api_key()?;
        let text = query.text();
        let limit = query.limit().to_string();
        let url = self.endpoint(
            NEAREST_PATH,
            &[("words", text.as_str()), ("limit", limit.as_str())],
        )?;
        let request = HttpRequest::get(url).with_header(API_KEY_HEADER, key);

        let body = self.execute(request).await?;
        let response: NearestResponse = from_slice(&body)?;
        response.input.validate()?;

        let mut neighbors = response.nearest;
        if neighbors.is_empty() {
            return Err(Error::EmptyResult(format!("no neighbors for '{text}'")));
        }
        if neighbors.len() > query.limit() {
            tracing::debug!(
                returned = neighbors.len(),
                limit = query.limit(),
                "truncating neighbor list"
            );
            neighbors.truncate(query.limit());
        }

        Ok(NearestResult {
            input: response.input,
            neighbors,
        })
    }

    /// Fetches images for several words in one request.
    ///
    /// Entries that fail to decode are logged and left out of the result.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty word list or missing key, `Transport`/`Server`
    /// on request failure, `Decode` if the body is not a word-to-string map.
    pub async fn fetch_bulk_images(&self, words: &[String]) -> Result<BulkImages> {
        let words: Vec<String> = words
            .iter()
            .map(|word| word.trim().to_owned())
            .filter(|word| !word.is_empty())
            .collect();
        if words.is_empty() {
            return Err(Error::InvalidInput("Enter at least one word.".to_owned()));
        }
        let key = self.api_key()?;
        let url = self.endpoint(BULK_IMAGE_PATH, &[("api_key", key)])?;
        let request = HttpRequest::post_json(url, to_vec(&words)?);

        let body = self.execute(request).await?;
        let entries: HashMap<String, Value> = from_slice(&body)?;
        let received = entries.len();
        let images = decode_batch(&words, entries, DecodePolicy::SkipInvalid)?;

        tracing::debug!(
            requested = words.len(),
            received,
            decoded = images.len(),
            "fetched bulk images"
        );
        Ok(images)
    }

    /// Fetches one image for the query.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_embeddings`]; an undecodable image fails the call.
    pub async fn fetch_single_image(&self, query: &Query) -> Result<ImageResult> {
        let key = self.api_key()?;
        let text = query.text();
        let url = self.endpoint(IMAGE_PATH, &[("words", text.as_str())])?;
        let request = HttpRequest::get(url).with_header(API_KEY_HEADER, key);

        let body = self.execute(request).await?;
        let response: ImageResponse = from_slice(&body)?;
        let mut batch = HashMap::new();
        batch.insert(response.label.clone(), Value::String(response.image_base64));

        decode_batch(&[response.label.clone()], batch, DecodePolicy::FailFast)?
            .remove(&response.label)
            .ok_or_else(|| Error::Decode(format!("No image returned for '{}'", query.text())))
    }

    /// Key to send, rejecting an empty credential before any request.
    fn api_key(&self) -> Result<&str> {
        if self.credential.is_empty() {
            return Err(Error::InvalidInput(
                "No API key configured. Set one with `wordlens key set <KEY>`.".to_owned(),
            ));
        }
        Ok(self.credential.as_str())
    }

    /// Builds `<base><path>?<params>` with percent-encoded parameters.
    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        if self.base_url.cannot_be_a_base() {
            return Err(Error::InvalidInput(format!(
                "Cannot build request URL from '{}'",
                self.base_url
            )));
        }
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(None);
        url.set_fragment(None);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().copied());
        }
        Ok(url)
    }

    /// Sends a request and returns the body of a `200` response.
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let start = Instant::now();
        let method = request.method;
        let path = request.url.path().to_owned();

        let response = self.transport.send(request).await.inspect_err(|error| {
            tracing::warn!(?method, %path, %error, "request failed");
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        if !response.is_ok() {
            tracing::warn!(?method, %path, status = response.status, latency_ms, "server error");
            return Err(Error::Server {
                status: response.status,
            });
        }

        tracing::debug!(
            ?method,
            %path,
            transport = self.transport.name(),
            bytes = response.body.len(),
            latency_ms,
            "request completed"
        );
        Ok(response.body)
    }
}
