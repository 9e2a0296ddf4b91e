//! Feeling wheel label mapping
//!
//! Three levels: fine-grained tertiary labels fold into secondary labels,
//! which fold into one of seven primaries. Labels produced by the intensity
//! provider are mostly secondary; single-label providers emit primary names
//! (plus "Joy") directly.

use crate::error::{AnalyzeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimaryEmotion {
    Mad,
    Sad,
    Scared,
    Joyful,
    Powerful,
    Peaceful,
    Neutral,
}

impl PrimaryEmotion {
    pub const ALL: [PrimaryEmotion; 7] = [
        PrimaryEmotion::Mad,
        PrimaryEmotion::Sad,
        PrimaryEmotion::Scared,
        PrimaryEmotion::Joyful,
        PrimaryEmotion::Powerful,
        PrimaryEmotion::Peaceful,
        PrimaryEmotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryEmotion::Mad => "Mad",
            PrimaryEmotion::Sad => "Sad",
            PrimaryEmotion::Scared => "Scared",
            PrimaryEmotion::Joyful => "Joyful",
            PrimaryEmotion::Powerful => "Powerful",
            PrimaryEmotion::Peaceful => "Peaceful",
            PrimaryEmotion::Neutral => "Neutral",
        }
    }

    pub fn parse(label: &str) -> Option<PrimaryEmotion> {
        Self::ALL.into_iter().find(|p| p.as_str() == label)
    }
}

impl fmt::Display for PrimaryEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a label lands on the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'w> {
    pub primary: PrimaryEmotion,
    pub secondary: Option<&'w str>,
    pub tertiary: Option<&'w str>,
}

const TERTIARY: &[(&str, &str)] = &[
    ("Critical", "Angry"),
    ("Hurt", "Depressed"),
    ("Worried", "Anxious"),
    ("Hopeful", "Confident"),
    ("Proud", "Confident"),
    ("Relaxed", "Content"),
];

const SECONDARY: &[(PrimaryEmotion, &[&str])] = &[
    (
        PrimaryEmotion::Mad,
        &["Anger", "Angry", "Annoyance", "Contempt", "Disapproval", "Disgust", "Envy", "Sarcasm"],
    ),
    (
        PrimaryEmotion::Sad,
        &[
            "Boredom",
            "Confused",
            "Depressed",
            "Disappointment",
            "Empathic Pain",
            "Guilt",
            "Pain",
            "Sadness",
            "Shame",
        ],
    ),
    (
        PrimaryEmotion::Scared,
        &[
            "Anxiety",
            "Anxious",
            "Awkwardness",
            "Confusion",
            "Distress",
            "Doubt",
            "Embarrassment",
            "Fear",
            "Horror",
            "Surprise (negative)",
        ],
    ),
    (
        PrimaryEmotion::Joyful,
        &[
            "Admiration",
            "Adoration",
            "Aesthetic Appreciation",
            "Amusement",
            "Awe",
            "Ecstasy",
            "Enthusiasm",
            "Excited",
            "Excitement",
            "Joy",
            "Love",
            "Romance",
            "Surprise (positive)",
        ],
    ),
    (
        PrimaryEmotion::Powerful,
        &["Confident", "Craving", "Desire", "Determination", "Pride", "Realization", "Triumph"],
    ),
    (
        PrimaryEmotion::Neutral,
        &[
            "Calmness",
            "Concentration",
            "Contemplation",
            "Content",
            "Contentment",
            "Entrancement",
            "Gratitude",
            "Interest",
            "Nostalgia",
            "Relief",
            "Satisfaction",
            "Surprise",
            "Sympathy",
            "Tiredness",
        ],
    ),
];

/// Label lookup tables for the three-level taxonomy
#[derive(Debug, Clone, Default)]
pub struct FeelingWheel {
    secondary: HashMap<String, PrimaryEmotion>,
    tertiary: HashMap<String, String>,
}

impl FeelingWheel {
    /// Empty wheel; only primary names resolve
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in wheel used for all provider output
    pub fn standard() -> Self {
        let mut wheel = Self::new();
        for (primary, labels) in SECONDARY {
            for label in labels.iter() {
                wheel.secondary.insert((*label).to_string(), *primary);
            }
        }
        for (tertiary, secondary) in TERTIARY {
            wheel
                .tertiary
                .insert((*tertiary).to_string(), (*secondary).to_string());
        }
        wheel
    }

    pub fn with_secondary(mut self, label: impl Into<String>, primary: PrimaryEmotion) -> Self {
        self.secondary.insert(label.into(), primary);
        self
    }

    /// Add a tertiary label; its secondary must already be on the wheel
    pub fn with_tertiary(
        mut self,
        label: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Result<Self> {
        let label = label.into();
        let secondary = secondary.into();
        if !self.secondary.contains_key(&secondary) {
            return Err(AnalyzeError::Taxonomy(format!(
                "tertiary '{}' points at unknown secondary '{}'",
                label, secondary
            )));
        }
        self.tertiary.insert(label, secondary);
        Ok(self)
    }

    pub fn secondary_count(&self) -> usize {
        self.secondary.len()
    }

    pub fn tertiary_count(&self) -> usize {
        self.tertiary.len()
    }

    pub fn resolve(&self, label: &str) -> Option<Resolved<'_>> {
        if let Some(primary) = PrimaryEmotion::parse(label) {
            return Some(Resolved {
                primary,
                secondary: None,
                tertiary: None,
            });
        }

        if let Some((tertiary, secondary)) = self.tertiary.get_key_value(label) {
            let (secondary, primary) = self.secondary.get_key_value(secondary.as_str())?;
            return Some(Resolved {
                primary: *primary,
                secondary: Some(secondary.as_str()),
                tertiary: Some(tertiary.as_str()),
            });
        }

        self.secondary
            .get_key_value(label)
            .map(|(secondary, primary)| Resolved {
                primary: *primary,
                secondary: Some(secondary.as_str()),
                tertiary: None,
            })
    }
}
