use thiserror::Error;

/// Errors returned by listing sources and the email provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider rejected the credentials (HTTP 401).
    #[error("{service} rejected the API key")]
    Unauthorized { service: String },

    /// The provider throttled the request or the account is out of credits
    /// (HTTP 403 or 429).
    #[error("rate limited or out of credits at {service}")]
    RateLimited { service: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl SourceError {
    /// Returns `true` when retrying with the same credentials cannot succeed.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SourceError::Unauthorized { .. })
    }
}
