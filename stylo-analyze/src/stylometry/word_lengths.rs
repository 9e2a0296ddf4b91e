//! Word length distribution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLengthStats {
    pub text_file: String,
    pub total_words: usize,
    pub mean: f64,
    pub median: f64,
    /// Most frequent length; ties go to the shorter length
    pub mode: usize,
    /// Share of words per length in characters
    pub relative_frequency: BTreeMap<usize, f64>,
}

/// Lengths (in chars) of UAX#29 words that contain at least one letter
pub fn word_lengths(text: &str) -> Vec<usize> {
    text.unicode_words()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .map(|w| w.chars().count())
        .collect()
}

/// `None` when the text has no words
pub fn word_length_distribution(text_file: impl Into<String>, text: &str) -> Option<WordLengthStats> {
    let mut lengths = word_lengths(text);
    if lengths.is_empty() {
        return None;
    }
    lengths.sort_unstable();

    let n = lengths.len();
    let mean = lengths.iter().sum::<usize>() as f64 / n as f64;
    let median = if n % 2 == 1 {
        lengths[n / 2] as f64
    } else {
        (lengths[n / 2 - 1] + lengths[n / 2]) as f64 / 2.0
    };

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for len in &lengths {
        *counts.entry(*len).or_insert(0) += 1;
    }
    let mode = counts
        .iter()
        .fold((0, 0), |(best_len, best_count), (len, count)| {
            if *count > best_count {
                (*len, *count)
            } else {
                (best_len, best_count)
            }
        })
        .0;
    let relative_frequency = counts
        .into_iter()
        .map(|(len, count)| (len, count as f64 / n as f64))
        .collect();

    Some(WordLengthStats {
        text_file: text_file.into(),
        total_words: n,
        mean,
        median,
        mode,
        relative_frequency,
    })
}
