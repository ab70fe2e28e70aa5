//! Error types for ASN collection

use thiserror::Error;

/// Errors a routing-data source can report for a single lookup
///
/// "No data" is not an error: sources signal it with `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Timeout, connection failure, rate-limit rejection or server error
    ///
    /// Retried within the adapter's retry budget, then treated as
    /// unresolved for fallback purposes.
    #[error("transient source failure: {0}")]
    Transient(String),

    /// The request was rejected as malformed or the payload was unusable
    #[error("fatal source failure: {0}")]
    Fatal(String),
}

impl SourceError {
    /// Whether another attempt against the same source may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            SourceError::Transient(e.to_string())
        } else if e.is_decode() || e.is_builder() {
            SourceError::Fatal(e.to_string())
        } else {
            SourceError::Transient(e.to_string())
        }
    }
}

/// Terminal errors of a collection run
///
/// Everything a single subnet can go through is recovered locally; these
/// are the environment failures that stop the batch.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration provided
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The checkpoint could not be persisted
    #[error("checkpoint error at {path}: {message}")]
    Checkpoint {
        /// Path of the checkpoint file
        path: String,
        /// What went wrong
        message: String,
    },
}

/// Result alias for collection operations
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::Transient("timeout".into()).is_transient());
        assert!(!SourceError::Fatal("bad request".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = CollectorError::Checkpoint {
            path: "run.json".to_string(),
            message: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("run.json"));
        assert!(msg.contains("disk full"));

        let err = CollectorError::Config("ipv4 prefix must be at most 32".to_string());
        assert!(err.to_string().contains("at most 32"));
    }
}
