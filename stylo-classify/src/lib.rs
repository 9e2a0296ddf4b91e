//! stylo-classify library interface
//!
//! Batch classification of book paragraphs through rate-limited external
//! services, with periodic checkpoints and a canonical JSON output per book.

pub mod config;
pub mod error;
pub mod segmenter;
pub mod services;
pub mod workflow;

pub use crate::error::{ClassifyError, PipelineError, PipelineResult};
pub use crate::segmenter::{Chapter, Segmenter, SegmenterConfig};
pub use crate::workflow::{BatchSummary, BookSummary, Pipeline, PipelineConfig, WorkflowEvent};
