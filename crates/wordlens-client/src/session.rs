//! Result holder for an interactive front end.
//!
//! Each user action runs one fetch sequence and commits its result in a single
//! step at completion. A failed sequence records a notice and leaves the
//! previously committed results untouched.

use std::sync::Mutex;

use wordlens_core::{
    EmbeddingResult, IgnoreLock as _, NearestResult, NeighborResult, Query, Result,
};

use crate::client::ApiClient;
use crate::images::{BulkImages, ImageResult};

/// A completed nearest-neighbor search with its images.
#[derive(Debug, Clone)]
pub struct SearchView {
    /// Query as sent, with the clamped limit.
    pub query: Query,
    /// Query embeddings and neighbors.
    pub nearest: NearestResult,
    /// Images for the neighbor words that decoded successfully.
    pub images: BulkImages,
}

/// A neighbor paired with its image, in result order.
#[derive(Debug, Clone, Copy)]
pub struct NeighborEntry<'view> {
    /// The neighbor.
    pub neighbor: &'view NeighborResult,
    /// Its image, when one was returned and decoded.
    pub image: Option<&'view ImageResult>,
}

impl SearchView {
    /// Neighbors joined with their images.
    pub fn entries(&self) -> Vec<NeighborEntry<'_>> {
        self.nearest
            .neighbors
            .iter()
            .map(|neighbor| NeighborEntry {
                neighbor,
                image: self.images.get(&neighbor.word),
            })
            .collect()
    }
}

/// Everything a front end displays.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Last successful search.
    pub search: Option<SearchView>,
    /// Last successful embeddings lookup.
    pub embeddings: Option<EmbeddingResult>,
    /// Last successful single image lookup.
    pub image: Option<ImageResult>,
    /// User-facing message from the last failed action.
    pub notice: Option<String>,
}

/// Runs user actions against the client and holds their results.
pub struct Session {
    /// Client used for every action.
    client: ApiClient,
    /// State shown to the user; locked only to commit or snapshot.
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session with empty state.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Client used by this session.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Searches for neighbors of `words_text`, then fetches their images.
    ///
    /// `limit_text` is parsed leniently, see [`Query::with_limit_text`].
    ///
    /// # Errors
    ///
    /// Any client error; the message is also recorded as the notice.
    pub async fn search(&self, words_text: &str, limit_text: &str) -> Result<SearchView> {
        let outcome = self.run_search(words_text, limit_text).await;
        self.commit(outcome, |state, view| state.search = Some(view.clone()))
    }

    /// Fetches a single image for `words_text`.
    ///
    /// # Errors
    ///
    /// Any client error; the message is also recorded as the notice.
    pub async fn lookup_image(&self, words_text: &str) -> Result<ImageResult> {
        let outcome = match Query::new(words_text) {
            Ok(query) => self.client.fetch_single_image(&query).await,
            Err(error) => Err(error),
        };
        self.commit(outcome, |state, image| state.image = Some(image.clone()))
    }

    /// Fetches the embeddings of `words_text`.
    ///
    /// # Errors
    ///
    /// Any client error; the message is also recorded as the notice.
    pub async fn embed(&self, words_text: &str) -> Result<EmbeddingResult> {
        let outcome = match Query::new(words_text) {
            Ok(query) => self.client.fetch_embeddings(&query).await,
            Err(error) => Err(error),
        };
        self.commit(outcome, |state, embeddings| {
            state.embeddings = Some(embeddings.clone());
        })
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock_ignore_poison().clone()
    }

    async fn run_search(&self, words_text: &str, limit_text: &str) -> Result<SearchView> {
        let query = Query::new(words_text)?.with_limit_text(limit_text);
        let nearest = self.client.fetch_nearest(&query).await?;
        let images = self
            .client
            .fetch_bulk_images(&nearest.neighbor_words())
            .await?;

        tracing::info!(
            query = %query.text(),
            neighbors = nearest.neighbors.len(),
            images = images.len(),
            "search completed"
        );
        Ok(SearchView {
            query,
            nearest,
            images,
        })
    }

    /// Applies a finished action to the state in one locked step.
    fn commit<T>(
        &self,
        outcome: Result<T>,
        apply: impl FnOnce(&mut SessionState, &T),
    ) -> Result<T> {
        let mut state = self.state.lock_ignore_poison();
        match &outcome {
            Ok(value) => {
                apply(&mut *state, value);
                state.notice = None;
            }
            Err(error) => {
                tracing::warn!(%error, "action failed");
                state.notice = Some(error.user_message());
            }
        }
        drop(state);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BULK_IMAGE_PATH, NEAREST_PATH};
    use crate::mock::{MockTransport, sample_png_base64};
    use reqwest::Url;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wordlens_core::Credential;

    fn session(mock: &MockTransport) -> Session {
        Session::new(ApiClient::new(
            Arc::new(mock.clone()),
            Url::parse("http://words.test").expect("valid url"),
            Credential::new("session-key"),
        ))
    }

    fn nearest_body(word: &str, neighbors: &[&str]) -> Value {
        json!({
            "input": {"words": [word], "embeddings": [[0.5, 0.5]]},
            "nearest": neighbors
                .iter()
                .map(|neighbor| json!({"word": neighbor, "distance": 0.25, "embedding": [0.1, 0.9]}))
                .collect::<Vec<_>>(),
        })
    }

    #[tokio::test]
    async fn empty_query_never_reaches_network() {
        let mock = MockTransport::new();
        let session = session(&mock);

        session.search("   ", "5").await.unwrap_err();
        session.lookup_image("").await.unwrap_err();
        session.embed(",").await.unwrap_err();

        assert_eq!(mock.request_count(), 0);
        assert_eq!(
            session.snapshot().notice.as_deref(),
            Some("Enter at least one word.")
        );
    }

    #[tokio::test]
    async fn images_requested_for_neighbor_words_only() {
        let png = sample_png_base64(1, 1).expect("encode png");
        let mock = MockTransport::new()
            .with_json(NEAREST_PATH, &nearest_body("sun", &["moon", "star"]))
            .with_json(BULK_IMAGE_PATH, &json!({"moon": png, "star": png}));

        let view = session(&mock).search("sun", "2").await.expect("search");
        assert_eq!(view.entries().len(), 2);

        let bulk = mock.requests_to(BULK_IMAGE_PATH);
        let body = bulk
            .first()
            .and_then(|request| request.body.clone())
            .expect("bulk body");
        let sent: Vec<String> = serde_json::from_slice(&body).expect("array body");
        assert_eq!(sent, ["moon", "star"]);
    }

    #[tokio::test]
    async fn failure_keeps_previous_search() {
        let png = sample_png_base64(1, 1).expect("encode png");
        let mock = MockTransport::new()
            .with_json(NEAREST_PATH, &nearest_body("sun", &["moon"]))
            .with_json(BULK_IMAGE_PATH, &json!({"moon": png}));
        let session = session(&mock);
        session.search("sun", "5").await.expect("first search");

        mock.set_status(BULK_IMAGE_PATH, 502);
        mock.set_json(NEAREST_PATH, &nearest_body("rain", &["cloud"]));
        let error = session.search("rain", "5").await.unwrap_err();

        let state = session.snapshot();
        let kept = state.search.expect("previous search kept");
        assert_eq!(kept.query.text(), "sun");
        assert_eq!(kept.nearest.neighbor_words(), ["moon"]);
        assert_eq!(state.notice, Some(error.user_message()));
    }

    #[tokio::test]
    async fn success_clears_notice() {
        let mock = MockTransport::new().with_json(NEAREST_PATH, &nearest_body("sun", &["moon"]));
        let session = session(&mock);

        session.embed("").await.unwrap_err();
        assert!(session.snapshot().notice.is_some());

        let embeddings = session.embed("sun").await.expect("embed");
        let state = session.snapshot();
        assert!(state.notice.is_none());
        assert_eq!(state.embeddings, Some(embeddings));
    }

    #[tokio::test]
    async fn entries_without_images_are_kept() {
        let mock = MockTransport::new()
            .with_json(NEAREST_PATH, &nearest_body("sun", &["moon", "star"]))
            .with_json(BULK_IMAGE_PATH, &json!({"moon": "%%%"}));

        let view = session(&mock).search("sun", "").await.expect("search");
        let entries = view.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.image.is_none()));
    }
}
