//! Error types for source ingestion

use thiserror::Error;

use crate::store::StoreError;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Everything that can go wrong while ingesting one source
///
/// Fetch and envelope failures escalate to the retry executor. Item-level
/// and validation failures stay inside the source pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Rate limited by {url} (HTTP 429)")]
    RateLimited { url: String },

    #[error("Client error from {url}: HTTP {status}")]
    Client { url: String, status: u16 },

    #[error("Server error from {url}: HTTP {status}")]
    Server { url: String, status: u16 },

    #[error("Malformed {format} envelope from {source_name}: {message}")]
    EnvelopeParse {
        source_name: String,
        format: &'static str,
        message: String,
    },

    #[error("Malformed item {index}: {message}")]
    ItemParse { index: usize, message: String },

    #[error("Record rejected: {reason}")]
    ValidationRejected { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    pub(crate) fn envelope(
        source_name: &str,
        format: &'static str,
        message: impl ToString,
    ) -> Self {
        IngestError::EnvelopeParse {
            source_name: source_name.to_string(),
            format,
            message: message.to_string(),
        }
    }

    pub(crate) fn item(index: usize, message: impl ToString) -> Self {
        IngestError::ItemParse {
            index,
            message: message.to_string(),
        }
    }

    /// Whether this error aborts the source attempt and triggers a retry
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            IngestError::Network { .. }
                | IngestError::RateLimited { .. }
                | IngestError::Client { .. }
                | IngestError::Server { .. }
                | IngestError::EnvelopeParse { .. }
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(url: &str, status: reqwest::StatusCode) -> Self {
        let url = url.to_string();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            IngestError::RateLimited { url }
        } else if status.is_server_error() {
            IngestError::Server {
                url,
                status: status.as_u16(),
            }
        } else {
            // 4xx, plus redirects reqwest did not follow
            IngestError::Client {
                url,
                status: status.as_u16(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        let url = "https://remoteok.com/api";

        assert!(matches!(
            IngestError::from_status(url, StatusCode::TOO_MANY_REQUESTS),
            IngestError::RateLimited { .. }
        ));
        assert!(matches!(
            IngestError::from_status(url, StatusCode::NOT_FOUND),
            IngestError::Client { status: 404, .. }
        ));
        assert!(matches!(
            IngestError::from_status(url, StatusCode::BAD_GATEWAY),
            IngestError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn test_only_source_level_errors_escalate() {
        assert!(IngestError::RateLimited { url: "u".into() }.escalates());
        assert!(IngestError::envelope("RemoteOK", "json", "expected array").escalates());
        assert!(!IngestError::item(3, "not an object").escalates());
        assert!(!IngestError::ValidationRejected {
            reason: "blank title".into()
        }
        .escalates());
    }
}
