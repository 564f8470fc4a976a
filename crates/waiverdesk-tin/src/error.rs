use thiserror::Error;

/// Errors returned by the tax-authority and proxy clients.
#[derive(Debug, Error)]
pub enum TinError {
    /// Network, timeout, or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream base URL or credential was never configured.
    #[error("upstream tax service is not configured")]
    NotConfigured,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid credential header: {0}")]
    InvalidHeader(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
