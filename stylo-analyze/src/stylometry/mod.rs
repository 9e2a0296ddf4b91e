//! Stylometry statistics over raw book text

pub mod divergence;
pub mod punctuation;
pub mod word_lengths;

pub use divergence::{
    divergence_matrix, js_distance, js_divergence, token_frequencies, DivergenceMatrix,
    DivergencePair,
};
pub use punctuation::{count_punctuation, normalize, PunctuationProfile};
pub use word_lengths::{word_length_distribution, WordLengthStats};
