use core::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Neighbor count used when none (or an unreadable one) is given.
pub const DEFAULT_LIMIT: usize = 5;
/// Smallest neighbor count the service accepts.
pub const MIN_LIMIT: usize = 1;
/// Largest neighbor count the service accepts.
pub const MAX_LIMIT: usize = 20;

/// Clamps a neighbor count into `[MIN_LIMIT, MAX_LIMIT]`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// A query of one or more words with a neighbor-count limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Words in the order the user typed them.
    words: Vec<String>,
    /// Clamped neighbor count.
    limit: usize,
}

impl Query {
    /// Parses free text into a query, splitting on whitespace and commas.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the text contains no words.
    pub fn new(text: &str) -> Result<Self> {
        Self::from_words(text.split(|ch: char| ch.is_whitespace() || ch == ','))
    }

    /// Builds a query from already separated words; blank entries are skipped.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if no non-blank word remains.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_owned())
            .filter(|word| !word.is_empty())
            .collect();

        if words.is_empty() {
            return Err(Error::InvalidInput("Enter at least one word.".to_owned()));
        }

        Ok(Self {
            words,
            limit: DEFAULT_LIMIT,
        })
    }

    /// Sets the neighbor count, clamped into the accepted range.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    /// Sets the neighbor count from user-typed text.
    ///
    /// Text that is not an integer falls back to `DEFAULT_LIMIT`. Integers
    /// outside the accepted range clamp to the nearer bound, however many
    /// digits they have.
    #[must_use]
    pub fn with_limit_text(mut self, text: &str) -> Self {
        let trimmed = text.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        self.limit = if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            DEFAULT_LIMIT
        } else if negative {
            MIN_LIMIT
        } else {
            // Only overflow can fail here.
            digits.parse::<usize>().map_or(MAX_LIMIT, clamp_limit)
        };
        self
    }

    /// Words in input order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Normalized query text sent on the wire.
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Clamped neighbor count.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Embeddings echoed back for the query words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// Query words as understood by the service.
    pub words: Vec<String>,
    /// One embedding per word, in the same order.
    pub embeddings: Vec<Vec<f64>>,
    /// Mean of the word embeddings, when the service computes it.
    #[serde(default)]
    pub average_embedding: Option<Vec<f64>>,
}

impl EmbeddingResult {
    /// Checks that every word has exactly one embedding and that all vectors,
    /// the average included, share one dimension.
    ///
    /// # Errors
    /// Returns `Error::Decode` when the counts or the vector lengths differ.
    pub fn validate(&self) -> Result<()> {
        if self.words.len() != self.embeddings.len() {
            return Err(Error::Decode(format!(
                "{} words but {} embeddings",
                self.words.len(),
                self.embeddings.len()
            )));
        }

        let expected = self.dimensions();
        let vectors = self.embeddings.iter().chain(&self.average_embedding);
        if let Some(mismatch) = vectors.map(Vec::len).find(|len| *len != expected) {
            return Err(Error::Decode(format!(
                "embedding of length {mismatch} in a {expected}-dimensional result"
            )));
        }
        Ok(())
    }

    /// Embedding of a given word, if it was part of the query.
    pub fn embedding_for(&self, word: &str) -> Option<&[f64]> {
        self.words
            .iter()
            .position(|candidate| candidate == word)
            .and_then(|index| self.embeddings.get(index))
            .map(Vec::as_slice)
    }

    /// Dimension of the embedding space (zero for an empty result).
    pub fn dimensions(&self) -> usize {
        self.embeddings.first().map_or(0, Vec::len)
    }
}

/// A word close to the query in embedding space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    /// The neighboring word.
    pub word: String,
    /// Distance from the query under the service's metric.
    pub distance: f64,
    /// Embedding of the neighboring word.
    #[serde(default)]
    pub embedding: Vec<f64>,
}

/// Result of a nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestResult {
    /// Embeddings of the query words.
    pub input: EmbeddingResult,
    /// Neighbors ordered as returned by the service.
    pub neighbors: Vec<NeighborResult>,
}

impl NearestResult {
    /// Neighbor words in result order.
    pub fn neighbor_words(&self) -> Vec<String> {
        self.neighbors
            .iter()
            .map(|neighbor| neighbor.word.clone())
            .collect()
    }
}

/// API key used to authenticate against the service.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a key, trimming surrounding whitespace.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self(key.trim().to_owned())
    }

    /// Raw key value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no key is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key with all but the last four characters hidden.
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 8 {
            return "*".repeat(count);
        }
        let tail: String = self.0.chars().skip(count - 4).collect();
        format!("{}{tail}", "*".repeat(count - 4))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("Credential")
            .field(&self.masked())
            .finish()
    }
}

/// HTTP verbs used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// A fully built request handed to a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute URL including the encoded query string.
    pub url: Url,
    /// Extra headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body for `POST` requests.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a `GET` request.
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `POST` request carrying a JSON body.
    pub fn post_json(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: Some(body),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Looks up a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Looks up a decoded query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only `200` counts as success; every other status is a server error.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
