//! Output data model shared by the classifier and the analyzers
//!
//! The on-disk shape is the one downstream chart and statistics tools consume:
//!
//! ```text
//! [ { "chapter": 1, "emotions": [ {"paragraph": "...", "emotion": "Joy"} ] },
//!   { "chapter": 2, "classifications": [ {"paragraph": "...", "aspect": "Dialogue"} ] },
//!   { "chapter": 3, "emotions": [ {"paragraph": "...", "emotions": {"Joy": 0.6}} ] } ]
//! ```
//!
//! Label enums are closed. Anything a service returns outside the set is an
//! invalid response, and the explicit `Unknown` variant is the sentinel written
//! when a paragraph could not be classified.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Labels
// ============================================================================

/// Emotional tone of a paragraph (single-label classification)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Joy,
    Sad,
    Powerful,
    Peaceful,
    Scared,
    Mad,
    Neutral,
    /// Sentinel: classification unavailable for this paragraph
    Unknown,
}

impl Emotion {
    /// Labels a service may legitimately return
    pub const KNOWN: [Emotion; 7] = [
        Emotion::Joy,
        Emotion::Sad,
        Emotion::Powerful,
        Emotion::Peaceful,
        Emotion::Scared,
        Emotion::Mad,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "Joy",
            Emotion::Sad => "Sad",
            Emotion::Powerful => "Powerful",
            Emotion::Peaceful => "Peaceful",
            Emotion::Scared => "Scared",
            Emotion::Mad => "Mad",
            Emotion::Neutral => "Neutral",
            Emotion::Unknown => "Unknown",
        }
    }

    /// Exact match against the known labels; `Unknown` is never accepted from a service
    pub fn parse_known(label: &str) -> Option<Emotion> {
        Self::KNOWN.into_iter().find(|e| e.as_str() == label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s == Emotion::Unknown.as_str() {
            return Ok(Emotion::Unknown);
        }
        Emotion::parse_known(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown emotion label: {:?}", s)))
    }
}

/// Narrative aspect of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aspect {
    Dialogue,
    Action,
    Exposition,
    Description,
    #[serde(rename = "Inner Thoughts")]
    InnerThoughts,
    /// Sentinel: classification unavailable for this paragraph
    Unknown,
}

impl Aspect {
    pub const KNOWN: [Aspect; 5] = [
        Aspect::Dialogue,
        Aspect::Action,
        Aspect::Exposition,
        Aspect::Description,
        Aspect::InnerThoughts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Dialogue => "Dialogue",
            Aspect::Action => "Action",
            Aspect::Exposition => "Exposition",
            Aspect::Description => "Description",
            Aspect::InnerThoughts => "Inner Thoughts",
            Aspect::Unknown => "Unknown",
        }
    }

    pub fn parse_known(label: &str) -> Option<Aspect> {
        Self::KNOWN.into_iter().find(|a| a.as_str() == label)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aspect {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s == Aspect::Unknown.as_str() {
            return Ok(Aspect::Unknown);
        }
        Aspect::parse_known(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown aspect label: {:?}", s)))
    }
}

// ============================================================================
// Classification results
// ============================================================================

/// What a classifier produces for one paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationTask {
    /// One label out of [`Emotion::KNOWN`]
    EmotionLabel,
    /// One label out of [`Aspect::KNOWN`]
    Aspect,
    /// Mapping from emotion name to intensity in [0, 1]
    EmotionIntensity,
}

impl ClassificationTask {
    /// Key holding the paragraph results inside a chapter record
    pub fn collection_key(&self) -> &'static str {
        match self {
            ClassificationTask::Aspect => "classifications",
            ClassificationTask::EmotionLabel | ClassificationTask::EmotionIntensity => "emotions",
        }
    }

    /// Placeholder written when classification cannot be completed
    pub fn sentinel(&self) -> Classification {
        match self {
            ClassificationTask::EmotionLabel => Classification::Emotion(Emotion::Unknown),
            ClassificationTask::Aspect => Classification::Aspect(Aspect::Unknown),
            ClassificationTask::EmotionIntensity => Classification::Emotions(BTreeMap::new()),
        }
    }
}

/// Label or intensity mapping for one paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Emotion(Emotion),
    Aspect(Aspect),
    Emotions(BTreeMap<String, f64>),
}

impl Classification {
    pub fn is_sentinel(&self) -> bool {
        match self {
            Classification::Emotion(e) => *e == Emotion::Unknown,
            Classification::Aspect(a) => *a == Aspect::Unknown,
            Classification::Emotions(map) => map.is_empty(),
        }
    }

    pub fn task(&self) -> ClassificationTask {
        match self {
            Classification::Emotion(_) => ClassificationTask::EmotionLabel,
            Classification::Aspect(_) => ClassificationTask::Aspect,
            Classification::Emotions(_) => ClassificationTask::EmotionIntensity,
        }
    }
}

/// A paragraph paired with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphResult {
    pub paragraph: String,
    #[serde(flatten)]
    pub classification: Classification,
}

impl ParagraphResult {
    pub fn new(paragraph: impl Into<String>, classification: Classification) -> Self {
        Self {
            paragraph: paragraph.into(),
            classification,
        }
    }
}

// ============================================================================
// Chapter and book records
// ============================================================================

/// Ordered paragraph results for one chapter (1-based index)
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    pub chapter: usize,
    pub task: ClassificationTask,
    pub results: Vec<ParagraphResult>,
}

impl ChapterRecord {
    pub fn sentinel_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.classification.is_sentinel())
            .count()
    }
}

impl Serialize for ChapterRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("chapter", &self.chapter)?;
        map.serialize_entry(self.task.collection_key(), &self.results)?;
        map.end()
    }
}

#[derive(Deserialize)]
struct RawChapter {
    chapter: usize,
    #[serde(default)]
    emotions: Option<Vec<ParagraphResult>>,
    #[serde(default)]
    classifications: Option<Vec<ParagraphResult>>,
}

impl<'de> Deserialize<'de> for ChapterRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawChapter::deserialize(deserializer)?;
        match (raw.emotions, raw.classifications) {
            (_, Some(results)) => Ok(ChapterRecord {
                chapter: raw.chapter,
                task: ClassificationTask::Aspect,
                results,
            }),
            (Some(results), None) => {
                let task = results
                    .first()
                    .map(|r| r.classification.task())
                    .unwrap_or(ClassificationTask::EmotionLabel);
                Ok(ChapterRecord {
                    chapter: raw.chapter,
                    task,
                    results,
                })
            }
            (None, None) => Err(de::Error::custom(format!(
                "chapter {} has neither \"emotions\" nor \"classifications\"",
                raw.chapter
            ))),
        }
    }
}

/// All chapter records of one book, in chapter order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookRecord {
    pub chapters: Vec<ChapterRecord>,
}

impl BookRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chapter: ChapterRecord) {
        self.chapters.push(chapter);
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn paragraph_count(&self) -> usize {
        self.chapters.iter().map(|c| c.results.len()).sum()
    }

    pub fn sentinel_count(&self) -> usize {
        self.chapters.iter().map(ChapterRecord::sentinel_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emotion_label_serializes_flat() {
        let result = ParagraphResult::new("It was a bright day.", Classification::Emotion(Emotion::Joy));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"paragraph": "It was a bright day.", "emotion": "Joy"}));
    }

    #[test]
    fn test_aspect_uses_display_name() {
        let result = ParagraphResult::new("p", Classification::Aspect(Aspect::InnerThoughts));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["aspect"], "Inner Thoughts");
    }

    #[test]
    fn test_chapter_key_follows_task() {
        let chapter = ChapterRecord {
            chapter: 3,
            task: ClassificationTask::Aspect,
            results: vec![ParagraphResult::new("p", Classification::Aspect(Aspect::Action))],
        };
        let value = serde_json::to_value(&chapter).unwrap();
        assert_eq!(value["chapter"], 3);
        assert!(value.get("classifications").is_some());
        assert!(value.get("emotions").is_none());
    }

    #[test]
    fn test_book_reads_intensity_output() {
        let raw = json!([
            {"chapter": 1, "emotions": [
                {"paragraph": "a", "emotions": {"Joy": 0.6, "Awe": 0.1}},
                {"paragraph": "b", "emotions": {}}
            ]}
        ]);
        let book: BookRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.chapters[0].task, ClassificationTask::EmotionIntensity);
        assert_eq!(book.paragraph_count(), 2);
        assert_eq!(book.sentinel_count(), 1);
    }

    #[test]
    fn test_chapter_without_results_key_is_rejected() {
        let raw = json!({"chapter": 1});
        assert!(serde_json::from_value::<ChapterRecord>(raw).is_err());
    }

    #[test]
    fn test_parse_known_is_exact() {
        assert_eq!(Emotion::parse_known("Joy"), Some(Emotion::Joy));
        assert_eq!(Emotion::parse_known("joy"), None);
        assert_eq!(Emotion::parse_known("Unknown"), None);
        assert_eq!(Aspect::parse_known("Inner Thoughts"), Some(Aspect::InnerThoughts));
        assert_eq!("Unknown".parse::<Emotion>().unwrap(), Emotion::Unknown);
        assert!("Sadness".parse::<Emotion>().is_err());
        assert!("inner thoughts".parse::<Aspect>().is_err());
    }

    #[test]
    fn test_sentinels_per_task() {
        assert!(ClassificationTask::EmotionLabel.sentinel().is_sentinel());
        assert!(ClassificationTask::Aspect.sentinel().is_sentinel());
        assert!(ClassificationTask::EmotionIntensity.sentinel().is_sentinel());
        assert!(!Classification::Emotion(Emotion::Neutral).is_sentinel());
    }
}
