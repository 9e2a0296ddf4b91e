//! Three-level emotion taxonomy (feeling wheel)

mod aggregator;
mod mapping;

pub use aggregator::{TaxonomyAggregator, WheelProfile};
pub use mapping::{FeelingWheel, PrimaryEmotion, Resolved};
