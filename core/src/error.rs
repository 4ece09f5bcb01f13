//! Error types for the todo API client.
//!
//! # Design
//! The only classification is by HTTP status. 401 gets a dedicated variant
//! because the session policy reacts to it; 404 keeps its own variant because
//! callers frequently distinguish "does not exist" from other failures. Both
//! keep the body the backend sent.
//! Every other non-2xx response lands in `Http` with the raw status and body,
//! exactly as the backend sent it.

use thiserror::Error;

/// Errors returned by `ApiClient` and the domain API modules.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 401 for a request under the session policy. The
    /// session store has already been cleared when this is returned;
    /// `session_cleared` tells whether this response is the one that cleared it,
    /// and `generation` is the session generation that was cleared.
    #[error("unauthorized")]
    Unauthorized { session_cleared: bool, generation: u64 },

    /// The server returned 404.
    #[error("resource not found: {body}")]
    NotFound { body: String },

    /// The server returned any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// Input rejected before a request was built.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}
