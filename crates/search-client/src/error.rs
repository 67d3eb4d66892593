//! Transport error type shared by every `SearchClient` implementation.

use thiserror::Error;

/// A network or service failure on any collaborator call.
///
/// Transport errors are fatal for a verification run: nothing retries them.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The service answered with a non-success status.
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The response was valid JSON but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    /// A scroll id was used that the service does not know about.
    #[error("unknown scroll id: {0}")]
    UnknownScroll(String),

    /// The requested index does not exist.
    #[error("index not found: {0}")]
    IndexNotFound(String),
}

impl TransportError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }
}
