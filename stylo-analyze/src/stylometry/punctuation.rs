//! Punctuation profile
//!
//! Counts are per mark and non-overlapping. Several marks share a character
//! (`apostrophe` and `single_quote`, `quotation_mark` and `double_quote`,
//! `period` and `ellipsis`), so the same character contributes to more than
//! one entry. Downstream charts were built against exactly these counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MARKS: [(&str, &str); 16] = [
    ("period", "."),
    ("comma", ","),
    ("exclamation", "!"),
    ("question", "?"),
    ("semicolon", ";"),
    ("colon", ":"),
    ("em_dash", "\u{2014}"),
    ("en_dash", "\u{2013}"),
    ("hyphen", "-"),
    ("single_quote", "'"),
    ("double_quote", "\""),
    ("left_paren", "("),
    ("right_paren", ")"),
    ("ellipsis", "..."),
    ("apostrophe", "'"),
    ("quotation_mark", "\""),
];

pub fn count_punctuation(text: &str) -> BTreeMap<String, usize> {
    MARKS
        .iter()
        .map(|(name, mark)| (name.to_string(), text.matches(*mark).count()))
        .collect()
}

/// Relative frequency of each mark; all zeros when nothing was counted
pub fn normalize(counts: &BTreeMap<String, usize>) -> BTreeMap<String, f64> {
    let total: usize = counts.values().sum();
    counts
        .iter()
        .map(|(name, count)| {
            let freq = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64
            };
            (name.clone(), freq)
        })
        .collect()
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunctuationProfile {
    pub text_file: String,
    pub raw_counts: BTreeMap<String, usize>,
    pub normalized_frequencies: BTreeMap<String, f64>,
}

impl PunctuationProfile {
    pub fn analyze(text_file: impl Into<String>, text: &str) -> Self {
        let raw_counts = count_punctuation(text);
        let normalized_frequencies = normalize(&raw_counts);
        Self {
            text_file: text_file.into(),
            raw_counts,
            normalized_frequencies,
        }
    }
}
