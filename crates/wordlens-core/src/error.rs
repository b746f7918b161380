use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;

/// Result type for client operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while talking to the embedding service.
#[derive(Debug, Error)]
pub enum Error {
    /// The query or credential was rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-200 status.
    #[error("Server error: HTTP {status}")]
    Server {
        /// Status code returned by the service.
        status: u16,
    },

    /// The response body (JSON or an embedded image) could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The service returned no neighbors for the query.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// An I/O operation on local settings failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] TomlDeError),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] TomlSerError),
}

impl Error {
    /// Message shown to the user in place of the result.
    ///
    /// Server errors are deliberately generic: the status code is kept in the
    /// `Display` form for logs only.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(message) => message.clone(),
            Self::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_owned()
            }
            Self::Server { .. } => {
                "The server returned an error. Check your API key and try again.".to_owned()
            }
            Self::Decode(_) => "The server sent a response that could not be read.".to_owned(),
            Self::EmptyResult(_) => "No neighbors found for this query.".to_owned(),
            Self::Io(_) | Self::Config(_) | Self::TomlDe(_) | Self::TomlSer(_) => {
                format!("Local settings error: {self}")
            }
        }
    }
}

impl From<SerdeJsonError> for Error {
    fn from(error: SerdeJsonError) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<ReqwestError> for Error {
    fn from(error: ReqwestError) -> Self {
        Self::Transport(error.to_string())
    }
}
