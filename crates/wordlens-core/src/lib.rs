//! Core types and traits for the wordlens embedding client.
//!
//! This crate provides the query and result types, error handling, the
//! transport seam and client configuration shared by the client and CLI.

/// Client configuration and home directory layout.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Lock helpers.
pub mod sync;
/// Trait definitions for request transports.
pub mod traits;
/// Core data types for queries, results and requests.
pub mod types;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use sync::IgnoreLock;
pub use traits::Transport;
pub use types::{
    Credential, DEFAULT_LIMIT, EmbeddingResult, HttpMethod, HttpRequest, HttpResponse, MAX_LIMIT,
    MIN_LIMIT, NearestResult, NeighborResult, Query, clamp_limit,
};
