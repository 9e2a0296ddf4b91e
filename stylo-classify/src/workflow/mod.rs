//! Batch classification workflow
//!
//! Books are processed one after another, chapters in order, and the paragraphs of
//! a chapter concurrently under the classifier's caps:
//! 1. Segment the book into chapters and paragraphs
//! 2. Classify each chapter's paragraphs (sentinel on failure)
//! 3. Re-assemble results in paragraph order
//! 4. Snapshot every N chapters, write the canonical output at the end

pub mod aggregator;
pub mod checkpoint;
pub mod pipeline;

pub use checkpoint::CheckpointWriter;
pub use pipeline::{Pipeline, PipelineConfig};

use crate::error::{ClassifyError, PipelineError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress events for library users and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    BookStarted {
        book: String,
        /// Unix timestamp (seconds since epoch)
        timestamp: i64,
    },

    ChapterStarted {
        book: String,
        chapter: usize,
        paragraphs: usize,
    },

    ChapterCompleted {
        book: String,
        chapter: usize,
        paragraphs: usize,
        sentinels: usize,
    },

    CheckpointWritten {
        book: String,
        path: PathBuf,
        chapters: usize,
    },

    BookCompleted {
        book: String,
        output: PathBuf,
        chapters: usize,
        paragraphs: usize,
        sentinels: usize,
        timestamp: i64,
    },

    /// Book had nothing to classify
    BookSkipped { book: String, reason: String },

    /// Book aborted (checkpoint could not be written, unreadable file)
    BookFailed { book: String, message: String },
}

/// Sentinel paragraphs by kind of the last error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureTally {
    pub rate_limited: usize,
    pub timeouts: usize,
    pub invalid_responses: usize,
    pub service_errors: usize,
}

impl FailureTally {
    /// Count a paragraph-level failure; book-level errors are not counted
    pub fn record(&mut self, error: &PipelineError) {
        match error {
            PipelineError::ServiceTimeout => self.timeouts += 1,
            PipelineError::MalformedServiceResponse(_) => self.invalid_responses += 1,
            PipelineError::ClassificationFailed { last, .. } => match last {
                ClassifyError::RateLimited => self.rate_limited += 1,
                ClassifyError::Timeout => self.timeouts += 1,
                ClassifyError::InvalidResponse(_) => self.invalid_responses += 1,
                ClassifyError::Service(_) => self.service_errors += 1,
            },
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.rate_limited + self.timeouts + self.invalid_responses + self.service_errors
    }

    pub fn merge(&mut self, other: &FailureTally) {
        self.rate_limited += other.rate_limited;
        self.timeouts += other.timeouts;
        self.invalid_responses += other.invalid_responses;
        self.service_errors += other.service_errors;
    }
}

/// Outcome of one processed book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub book: String,
    pub chapters: usize,
    pub paragraphs: usize,
    /// Paragraphs written with the sentinel result
    pub sentinels: usize,
    pub failures: FailureTally,
    /// Snapshot files written during the run (removed unless kept)
    pub checkpoints: Vec<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBook {
    pub book: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBook {
    pub book: String,
    pub error: String,
}

/// Outcome of a directory run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub completed: Vec<BookSummary>,
    pub skipped: Vec<SkippedBook>,
    pub failed: Vec<FailedBook>,
}

impl BatchSummary {
    pub fn total_sentinels(&self) -> usize {
        self.completed.iter().map(|b| b.sentinels).sum()
    }

    /// Failure counts over all completed books
    pub fn failures(&self) -> FailureTally {
        self.completed
            .iter()
            .fold(FailureTally::default(), |mut tally, book| {
                tally.merge(&book.failures);
                tally
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_by_kind() {
        let mut tally = FailureTally::default();
        tally.record(&PipelineError::ServiceTimeout);
        tally.record(&PipelineError::unavailable(3, ClassifyError::Timeout));
        tally.record(&PipelineError::unavailable(1, ClassifyError::InvalidResponse("x".into())));
        tally.record(&PipelineError::unavailable(2, ClassifyError::RateLimited));
        tally.record(&PipelineError::SegmentationEmpty("book.txt".into()));

        assert_eq!(tally.timeouts, 2);
        assert_eq!(tally.invalid_responses, 1);
        assert_eq!(tally.rate_limited, 1);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_batch_failures_merge_books() {
        let book = |rate_limited, timeouts| BookSummary {
            book: "b.txt".into(),
            chapters: 1,
            paragraphs: 10,
            sentinels: rate_limited + timeouts,
            failures: FailureTally {
                rate_limited,
                timeouts,
                ..FailureTally::default()
            },
            checkpoints: Vec::new(),
            output: PathBuf::from("b_emotions.json"),
        };
        let batch = BatchSummary {
            completed: vec![book(2, 1), book(0, 3)],
            ..BatchSummary::default()
        };

        let tally = batch.failures();
        assert_eq!(tally.rate_limited, 2);
        assert_eq!(tally.timeouts, 4);
        assert_eq!(tally.total(), batch.total_sentinels());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = WorkflowEvent::BookSkipped {
            book: "a.txt".into(),
            reason: "empty".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "BookSkipped");
        assert_eq!(value["book"], "a.txt");
    }
}
