//! Error types for SonarCloud harvesting operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the SonarCloud API or persisting results.
#[derive(Debug, Error)]
pub enum SonarError {
    /// Configuration is missing or incomplete.
    #[error("configuration required: {0}")]
    ConfigMissing(String),

    /// Configuration file could not be read or is invalid.
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The metrics ordering file does not exist.
    #[error("metrics ordering file {0} does not exist")]
    MetricsFileMissing(PathBuf),

    /// The metrics ordering file exists but could not be parsed.
    #[error("failed to read metrics ordering file: {0}")]
    MetricsFile(String),

    /// API request failed.
    #[error("SonarCloud API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Bisection narrowed a range to a single ncloc value that still
    /// matches at least `cap` projects.
    #[error("cannot split ncloc range [{lower}, {upper}): {count} matches with cap {cap}")]
    BoundCollapse {
        lower: u64,
        upper: u64,
        count: u64,
        cap: u64,
    },

    /// The issue search for one project reports more results than the API can page through.
    #[error("project '{project}' has {total} issues, more than the searchable limit of {limit}")]
    IssueOverflow {
        project: String,
        total: u64,
        limit: u64,
    },

    /// Filesystem error while writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A spawned task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SonarError {
    /// Whether this error is an HTTP status rejection from the API
    /// (as opposed to a transport, parsing or local failure).
    pub fn is_status_error(&self) -> bool {
        matches!(
            self,
            SonarError::ApiError {
                status_code: Some(_),
                ..
            } | SonarError::RateLimited { .. }
        )
    }
}

/// Result type alias for SonarCloud operations.
pub type Result<T> = core::result::Result<T, SonarError>;

/// Treat an HTTP rejection of a search or measure request as an empty result.
///
/// Any other error still propagates.
pub(crate) fn empty_on_rejection<T: Default>(result: Result<T>, endpoint: &str) -> Result<T> {
    match result {
        Err(err) if err.is_status_error() => {
            tracing::warn!(endpoint, error = %err, "request rejected, treating as empty");
            Ok(T::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_classification() {
        let api = SonarError::ApiError {
            message: "not found".to_string(),
            status_code: Some(404),
        };
        assert!(api.is_status_error());

        let local = SonarError::MetricsFileMissing(PathBuf::from("metrics.csv"));
        assert!(!local.is_status_error());
    }

    #[test]
    fn test_empty_on_rejection() {
        let rejected: Result<Vec<u32>> = Err(SonarError::ApiError {
            message: "HTTP 403 Forbidden".to_string(),
            status_code: Some(403),
        });
        assert_eq!(empty_on_rejection(rejected, "api/metrics/search").unwrap(), Vec::<u32>::new());

        let local: Result<Vec<u32>> = Err(SonarError::MetricsFile("bad row".to_string()));
        assert!(matches!(
            empty_on_rejection(local, "api/metrics/search"),
            Err(SonarError::MetricsFile(_))
        ));

        assert_eq!(empty_on_rejection(Ok(vec![1]), "api/metrics/search").unwrap(), vec![1]);
    }

    #[test]
    fn test_bound_collapse_message() {
        let err = SonarError::BoundCollapse {
            lower: 10,
            upper: 11,
            count: 12_000,
            cap: 10_000,
        };
        assert_eq!(
            err.to_string(),
            "cannot split ncloc range [10, 11): 12000 matches with cap 10000"
        );
    }
}
