//! Error types for the signal engine.
//!
//! Each processing boundary gets its own error enum. Transient upstream
//! failures surface as [`SourceError`] so the scheduler can count retry
//! attempts; everything that must not crash a sweep loop (parse failures,
//! missing preconditions, duplicate content) is modeled as an outcome, not
//! an error — see `ingest::IngestOutcome`.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors from the upstream market-data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request could not be built (bad base URL or parameters).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Connect or read timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Non-2xx response from the source.
    #[error("source returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl SourceError {
    /// Whether the caller should count this attempt and retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() || err.is_request() {
            Self::InvalidRequest(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors raised by ingestion components.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Upstream fetch failed; the scheduler may retry up to its cap.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Persistent store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised by the distribution gateway.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Cache read/write failure around publishing.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
