//! # Stylo Analyze
//!
//! Post-processing for classification results and raw book text:
//! - Feeling wheel aggregation of emotion results (primary/secondary/tertiary)
//! - Stylometry statistics (punctuation profile, word lengths, Jensen-Shannon distance)
//! - JSON report accumulation

pub mod error;
pub mod report;
pub mod stylometry;
pub mod taxonomy;

pub use error::{AnalyzeError, Result};
pub use taxonomy::{FeelingWheel, PrimaryEmotion, Resolved, TaxonomyAggregator, WheelProfile};
