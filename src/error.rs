//! Domain error handling for the pipeline

use thiserror::Error;

/// Main pipeline error type, grouped by subsystem per the error handling design.
#[derive(Debug, Error)]
pub enum PipelineError {
    // Network (HTTP Fetcher)
    #[error("request to {url} timed out")]
    FetchTimeout { url: String },

    #[error("request to {url} failed: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-success status {status} from {url}")]
    FetchNonSuccess { url: String, status: u16 },

    // Listing discovery
    #[error("feed {url} is malformed: {message}")]
    MalformedFeed { url: String, message: String },

    // Parse / extraction
    #[error("failed to parse JSON-LD block: {0}")]
    JsonLdParse(String),

    // Encoding
    #[error("encoder not initialized")]
    EncoderNotInitialized,

    #[error("failed to initialize encoder model: {0}")]
    EncoderInit(String),

    #[error("embedding batch failed: {0}")]
    EncodeBatchFailed(String),

    // Clustering
    #[error("group store is missing directory: {0}")]
    GroupStoreMissing(String),

    // Summarizer
    #[error("no summarizer API keys configured")]
    NoApiKeys,

    #[error("summarizer request exhausted retries: {0}")]
    SummarizerExhausted(String),

    // Filesystem / serialization
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<reqwest::Error> for PipelineError {
    fn from(source: reqwest::Error) -> Self {
        let url = source
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if source.is_timeout() {
            PipelineError::FetchTimeout { url }
        } else {
            PipelineError::FetchFailed { url, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_non_success_renders_url_and_status() {
        let err = PipelineError::FetchNonSuccess {
            url: "https://example.com".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "non-success status 404 from https://example.com"
        );
    }

    #[test]
    fn summarizer_exhausted_is_not_fatal_to_construct() {
        let err = PipelineError::SummarizerExhausted("title".into());
        assert!(err.to_string().contains("title"));
    }
}
