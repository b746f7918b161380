//! Client for the word-embedding service.
//!
//! [`ApiClient`] builds requests for the three service endpoints and decodes
//! their responses; [`Session`] holds the last successful result for a
//! presentation layer; [`CredentialStore`] resolves and persists the API key.

/// Endpoint operations.
pub mod client;
/// API key lookup chain and local settings.
pub mod credentials;
/// `reqwest`-backed transport.
pub mod http;
/// Base64 image decoding.
pub mod images;
/// In-memory transport for tests.
pub mod mock;
/// Result holder for one interactive user.
pub mod session;

pub use client::ApiClient;
pub use credentials::{
    BundledFileProvider, CredentialProvider, CredentialStore, EnvProvider, SettingsProvider,
    SettingsStore,
};
pub use http::HttpTransport;
pub use images::{BulkImages, DecodePolicy, ImageResult, decode_batch};
pub use mock::MockTransport;
pub use session::{NeighborEntry, SearchView, Session, SessionState};
