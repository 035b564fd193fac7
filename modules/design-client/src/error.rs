use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignError>;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 429. Split out from [`DesignError::Api`] so callers can apply
    /// backoff instead of treating it as a hard failure.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DesignError {
    fn from(err: reqwest::Error) -> Self {
        DesignError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DesignError {
    fn from(err: serde_json::Error) -> Self {
        DesignError::Parse(err.to_string())
    }
}
