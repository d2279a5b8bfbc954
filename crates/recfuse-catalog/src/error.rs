use thiserror::Error;

/// Errors returned by the catalog adapters.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The adapter did not answer within its time budget.
    #[error("catalog request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid catalog configuration: {0}")]
    InvalidConfig(String),
}

impl CatalogError {
    /// Returns `true` for errors that are worth retrying after a back-off delay.
    ///
    /// **Retriable:** connect failures, timeouts, HTTP 429 and 5xx.
    ///
    /// **Not retriable:** other 4xx statuses, malformed bodies, bad configuration.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            CatalogError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            CatalogError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            CatalogError::Timeout(_) => true,
            CatalogError::Deserialize { .. } | CatalogError::InvalidConfig(_) => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::UnexpectedStatus { status: 404, .. })
    }
}
