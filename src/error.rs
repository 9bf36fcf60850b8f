/// Boxed error produced by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Malformed input such as an empty base address or blank credentials.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Network or request execution error raised by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Request payload could not be encoded as JSON.
    #[error("serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Response body is not valid JSON for the requested type.
    #[error("deserialize error: {source}; body: {body}")]
    Deserialize {
        /// Parse failure reported by `serde_json`.
        #[source]
        source: serde_json::Error,
        /// Raw response body, kept for diagnostics.
        body: String,
    },
    /// The logical call was aborted through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
}

impl RestError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body carried by the error, if any.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } | Self::Deserialize { body, .. } => Some(body),
            _ => None,
        }
    }
}
