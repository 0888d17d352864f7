//! Error types for backend calls and dispatched actions.
//!
//! Library functions return these typed errors so callers can tell a network
//! failure from a server-reported rejection or a malformed payload. The CLI
//! wraps them in `anyhow` with context.

use thiserror::Error;

/// Failure of a single REST call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connect error, timeout, TLS).
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered 404 for the addressed resource.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The backend answered with a non-success status and a message.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL cannot address the endpoint.
    #[error("invalid url for {endpoint}: {message}")]
    InvalidUrl { endpoint: String, message: String },
}

impl ApiError {
    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Failure of a dispatched action (refresh, delete, cleanup).
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Cleanup was requested without a current reconciliation for the provider.
    #[error("no current sync result for provider {provider_id}; run a sync first")]
    StaleResult { provider_id: i64 },

    /// Some knowledge bases carry no expected collection name, so the orphan
    /// set may include collections that back them.
    #[error(
        "{count} knowledge base(s) on provider {provider_id} have no collection name; \
         refusing to delete orphans (use server-side cleanup)"
    )]
    UnmappedKnowledgeBases { provider_id: i64, count: usize },

    #[error("no vector database provider selected")]
    NoProviderSelected,

    /// The provider id is not in the loaded registry.
    #[error("unknown provider id {0}")]
    UnknownProvider(i64),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
