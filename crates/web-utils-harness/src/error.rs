//! Error types for the harness
//!
//! Outwardly every check is SUCCESS or FAILURE. [`CheckError`] carries the
//! reason internally so it can be logged and put in a scenario report.

use thiserror::Error;

/// Why a check failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("host clock returned non-positive time: {0}")]
    NonPositiveTime(f64),

    #[error("unexpected response code: got {got}, expected {expected}")]
    UnexpectedResponseCode { got: i32, expected: i32 },

    #[error("response body does not match expected data")]
    ResponseMismatch,

    #[error("host returned no response buffer")]
    MissingResponse,

    #[error("host returned no {0} string")]
    MissingHostString(&'static str),

    #[error("file handle not allocated")]
    NoFileHandle,

    #[error("{op} returned status {status}")]
    HostStatus { op: &'static str, status: i64 },

    #[error("{op} count mismatch: got {got}, expected {expected}")]
    CountMismatch {
        op: &'static str,
        got: i64,
        expected: i64,
    },

    #[error("file content does not match what was written")]
    ContentMismatch,

    #[error("{op} on an invalid handle returned {got}, expected -1")]
    MissingSentinel { op: &'static str, got: i64 },
}

/// Result type for checks
pub type CheckResult<T> = Result<T, CheckError>;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CheckError::CountMismatch {
            op: "file_write",
            got: 3,
            expected: 8,
        };
        assert_eq!(err.to_string(), "file_write count mismatch: got 3, expected 8");

        let err = CheckError::MissingSentinel {
            op: "file_read",
            got: 1,
        };
        assert_eq!(
            err.to_string(),
            "file_read on an invalid handle returned 1, expected -1"
        );
    }
}
