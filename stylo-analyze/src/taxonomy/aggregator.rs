//! Accumulates classification results onto the feeling wheel

use super::mapping::{FeelingWheel, PrimaryEmotion};
use crate::error::{AnalyzeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use stylo_common::{BookRecord, Classification, ParagraphResult};
use tracing::{debug, warn};

/// Normalized wheel distribution for one book (or any set of results)
///
/// All three levels are divided by `total_intensity`, the sum of everything
/// that reached a primary, so `primary` sums to 1.0 unless nothing mapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelProfile {
    pub primary: BTreeMap<PrimaryEmotion, f64>,
    pub secondary: BTreeMap<String, f64>,
    pub tertiary: BTreeMap<String, f64>,
    pub total_intensity: f64,
    pub unmapped: Vec<String>,
    pub sentinels: usize,
    pub paragraphs: usize,
}

impl WheelProfile {
    pub fn primary_share(&self, primary: PrimaryEmotion) -> f64 {
        self.primary.get(&primary).copied().unwrap_or(0.0)
    }

    /// Primary with the largest share; ties go to the earlier wheel position
    pub fn dominant(&self) -> Option<PrimaryEmotion> {
        self.primary
            .iter()
            .fold(None, |best: Option<(PrimaryEmotion, f64)>, (p, v)| match best {
                Some((_, b)) if b >= *v => best,
                _ => Some((*p, *v)),
            })
            .map(|(p, _)| p)
    }

    /// Fails if any label was left off the wheel
    pub fn ensure_mapped(&self) -> Result<()> {
        if self.unmapped.is_empty() {
            Ok(())
        } else {
            Err(AnalyzeError::UnmappedLabel(self.unmapped.join(", ")))
        }
    }
}

pub struct TaxonomyAggregator<'w> {
    wheel: &'w FeelingWheel,
    primary: BTreeMap<PrimaryEmotion, f64>,
    secondary: BTreeMap<String, f64>,
    tertiary: BTreeMap<String, f64>,
    unmapped: BTreeSet<String>,
    sentinels: usize,
    paragraphs: usize,
}

impl<'w> TaxonomyAggregator<'w> {
    pub fn new(wheel: &'w FeelingWheel) -> Self {
        Self {
            wheel,
            primary: BTreeMap::new(),
            secondary: BTreeMap::new(),
            tertiary: BTreeMap::new(),
            unmapped: BTreeSet::new(),
            sentinels: 0,
            paragraphs: 0,
        }
    }

    /// Add one label with its intensity. Returns false if the label is not on the wheel.
    pub fn add(&mut self, label: &str, intensity: f64) -> bool {
        let Some(resolved) = self.wheel.resolve(label) else {
            self.unmapped.insert(label.to_string());
            return false;
        };
        if !intensity.is_finite() || intensity < 0.0 {
            debug!(label, intensity, "Ignoring unusable intensity");
            return true;
        }

        *self.primary.entry(resolved.primary).or_insert(0.0) += intensity;
        if let Some(secondary) = resolved.secondary {
            *self.secondary.entry(secondary.to_string()).or_insert(0.0) += intensity;
        }
        if let Some(tertiary) = resolved.tertiary {
            *self.tertiary.entry(tertiary.to_string()).or_insert(0.0) += intensity;
        }
        true
    }

    /// Single labels count with intensity 1.0; aspect results are not emotions and are skipped.
    pub fn add_result(&mut self, result: &ParagraphResult) {
        match &result.classification {
            Classification::Aspect(_) => {}
            sentinel if sentinel.is_sentinel() => {
                self.paragraphs += 1;
                self.sentinels += 1;
            }
            Classification::Emotion(emotion) => {
                self.paragraphs += 1;
                self.add(emotion.as_str(), 1.0);
            }
            Classification::Emotions(intensities) => {
                self.paragraphs += 1;
                for (label, intensity) in intensities {
                    self.add(label, *intensity);
                }
            }
        }
    }

    /// Add every chapter of a book, or only the first `chapter_limit` chapters
    pub fn add_book(&mut self, book: &BookRecord, chapter_limit: Option<usize>) {
        let limit = chapter_limit.unwrap_or(usize::MAX);
        for chapter in book.chapters.iter().take(limit) {
            for result in &chapter.results {
                self.add_result(result);
            }
        }
    }

    /// Raw accumulated intensity for a primary
    pub fn primary_total(&self, primary: PrimaryEmotion) -> f64 {
        self.primary.get(&primary).copied().unwrap_or(0.0)
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &str> {
        self.unmapped.iter().map(String::as_str)
    }

    pub fn finish(self) -> WheelProfile {
        let total: f64 = self.primary.values().sum();

        if !self.unmapped.is_empty() {
            let labels: Vec<&str> = self.unmapped.iter().map(String::as_str).collect();
            warn!(
                count = labels.len(),
                labels = %labels.join(", "),
                "Labels missing from the feeling wheel"
            );
        }

        WheelProfile {
            primary: scale(self.primary, total),
            secondary: scale(self.secondary, total),
            tertiary: scale(self.tertiary, total),
            total_intensity: total,
            unmapped: self.unmapped.into_iter().collect(),
            sentinels: self.sentinels,
            paragraphs: self.paragraphs,
        }
    }
}

fn scale<K: Ord>(map: BTreeMap<K, f64>, total: f64) -> BTreeMap<K, f64> {
    if total > 0.0 {
        map.into_iter().map(|(k, v)| (k, v / total)).collect()
    } else {
        BTreeMap::new()
    }
}
