use leadscout_core::UpstreamError;
use thiserror::Error;

/// Errors returned by the geocoder and feature clients.
#[derive(Debug, Error)]
pub enum OsmError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl OsmError {
    /// Wraps this error for the engine, tagged with the service that failed.
    #[must_use]
    pub fn into_upstream(self, service: &'static str) -> UpstreamError {
        UpstreamError {
            service,
            message: self.to_string(),
        }
    }
}
