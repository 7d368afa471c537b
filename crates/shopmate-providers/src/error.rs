//! Error types for external collaborator calls.

/// Failure talking to a generation or search backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("backend returned status {0}: {1}")]
    Status(u16, String),
    #[error("unexpected response shape: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("missing API key: set {0}")]
    MissingApiKey(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}
