//! # Stylo Common Library
//!
//! Shared code for the stylo tools including:
//! - Output data model (labels, paragraph results, chapter and book records)
//! - Configuration loading and logging setup
//! - Atomic JSON output and report accumulation policy
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod time;

pub use error::{Error, Result};
pub use model::{
    Aspect, BookRecord, ChapterRecord, Classification, ClassificationTask, Emotion,
    ParagraphResult,
};
pub use output::AccumulationPolicy;
