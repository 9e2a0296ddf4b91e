//! Jensen-Shannon distance between token distributions
//!
//! Distances use the natural log, so they fall in `[0, sqrt(ln 2)]`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use unicode_segmentation::UnicodeSegmentation;

/// Lowercased UAX#29 tokens (words and punctuation, not whitespace) with counts
pub fn token_frequencies(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in text.split_word_bounds() {
        if token.chars().all(char::is_whitespace) {
            continue;
        }
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

/// Jensen-Shannon divergence of two count distributions over their joint vocabulary
///
/// Two empty distributions are identical; an empty one against a non-empty one
/// is maximally divergent.
pub fn js_divergence(a: &HashMap<String, usize>, b: &HashMap<String, usize>) -> f64 {
    let total_a: usize = a.values().sum();
    let total_b: usize = b.values().sum();
    match (total_a, total_b) {
        (0, 0) => return 0.0,
        (0, _) | (_, 0) => return std::f64::consts::LN_2,
        _ => {}
    }

    let vocabulary: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let mut kl_a = 0.0;
    let mut kl_b = 0.0;
    for token in vocabulary {
        let p = a.get(token).copied().unwrap_or(0) as f64 / total_a as f64;
        let q = b.get(token).copied().unwrap_or(0) as f64 / total_b as f64;
        let m = (p + q) / 2.0;
        if p > 0.0 {
            kl_a += p * (p / m).ln();
        }
        if q > 0.0 {
            kl_b += q * (q / m).ln();
        }
    }
    ((kl_a + kl_b) / 2.0).max(0.0)
}

pub fn js_distance(a: &HashMap<String, usize>, b: &HashMap<String, usize>) -> f64 {
    js_divergence(a, b).sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergencePair {
    pub author1: String,
    pub author2: String,
    pub divergence: f64,
}

/// Symmetric distance matrix with a zero diagonal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceMatrix {
    pub sources: Vec<String>,
    pub distances: Vec<Vec<f64>>,
}

impl DivergenceMatrix {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.distances.get(i)?.get(j).copied()
    }

    /// Upper-triangle entries as report rows
    pub fn pairs(&self) -> Vec<DivergencePair> {
        let mut pairs = Vec::new();
        for i in 0..self.sources.len() {
            for j in (i + 1)..self.sources.len() {
                pairs.push(DivergencePair {
                    author1: self.sources[i].clone(),
                    author2: self.sources[j].clone(),
                    divergence: self.distances[i][j],
                });
            }
        }
        pairs
    }
}

pub fn divergence_matrix(corpus: &[(String, HashMap<String, usize>)]) -> DivergenceMatrix {
    let n = corpus.len();
    let mut distances = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = js_distance(&corpus[i].1, &corpus[j].1);
            distances[i][j] = d;
            distances[j][i] = d;
        }
    }
    DivergenceMatrix {
        sources: corpus.iter().map(|(name, _)| name.clone()).collect(),
        distances,
    }
}
