//! Error types for stylo-classify
//!
//! Two layers: [`ClassifyError`] is what a classification service can fail with,
//! [`PipelineError`] is what processing a book can fail with. Service failures
//! never escape the pipeline; they degrade to sentinel results and are counted.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of one classification call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifyError {
    /// Service refused the request (HTTP 429 or equivalent)
    #[error("Rate limited by service")]
    RateLimited,

    /// Call exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// Response could not be parsed or carried a label outside the closed set
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure or non-success status
    #[error("Service error: {0}")]
    Service(String),
}

impl ClassifyError {
    /// Map a reqwest transport error onto the service taxonomy
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifyError::Timeout
        } else if err.is_decode() {
            ClassifyError::InvalidResponse(err.to_string())
        } else {
            ClassifyError::Service(err.to_string())
        }
    }

    /// Map a non-success HTTP status onto the service taxonomy
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ClassifyError::RateLimited
        } else {
            ClassifyError::Service(format!("HTTP {}: {}", status.as_u16(), truncate(body, 200)))
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Failure while processing a book
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Book contained no chapters after segmentation
    #[error("No chapters found in {0}")]
    SegmentationEmpty(String),

    /// Every attempt failed; recovered locally as a sentinel
    #[error("Classification failed after {attempts} attempt(s): {last}")]
    ClassificationFailed { attempts: u32, last: ClassifyError },

    /// Last attempt ran past its deadline; recovered locally as a sentinel
    #[error("Classification service timed out")]
    ServiceTimeout,

    /// Last attempt returned nothing usable; recovered locally as a sentinel
    #[error("Malformed service response: {0}")]
    MalformedServiceResponse(String),

    /// Progress for the current book cannot be persisted
    #[error("Failed to write checkpoint {path}: {source}")]
    CheckpointWriteFailed {
        path: PathBuf,
        #[source]
        source: stylo_common::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] stylo_common::Error),
}

impl PipelineError {
    /// Paragraph-level error for a classification whose attempts were all used up
    ///
    /// These never abort a book. The pipeline logs them, counts them in the
    /// book's [`FailureTally`](crate::workflow::FailureTally) and writes the sentinel.
    pub fn unavailable(attempts: u32, last: ClassifyError) -> Self {
        match last {
            ClassifyError::Timeout => PipelineError::ServiceTimeout,
            ClassifyError::InvalidResponse(msg) => PipelineError::MalformedServiceResponse(msg),
            other => PipelineError::ClassificationFailed {
                attempts,
                last: other,
            },
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ClassifyError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            ClassifyError::RateLimited
        );
        assert!(matches!(
            ClassifyError::from_status(reqwest::StatusCode::BAD_GATEWAY, "upstream"),
            ClassifyError::Service(msg) if msg.contains("502")
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let ClassifyError::Service(msg) =
            ClassifyError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body)
        else {
            panic!("expected service error");
        };
        assert!(msg.len() < 300);
    }

    #[test]
    fn test_unavailable_maps_last_error() {
        assert!(matches!(
            PipelineError::unavailable(3, ClassifyError::Timeout),
            PipelineError::ServiceTimeout
        ));
        assert!(matches!(
            PipelineError::unavailable(2, ClassifyError::InvalidResponse("bad".into())),
            PipelineError::MalformedServiceResponse(msg) if msg == "bad"
        ));
        assert!(matches!(
            PipelineError::unavailable(3, ClassifyError::RateLimited),
            PipelineError::ClassificationFailed {
                attempts: 3,
                last: ClassifyError::RateLimited
            }
        ));
    }
}
