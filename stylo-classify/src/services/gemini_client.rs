//! Gemini `generateContent` client (emotion label or narrative aspect)
//!
//! Uses enum-constrained output (`text/x.enum` with a string enum schema) so the
//! reply is a bare label. The label is still validated against the closed set.

use super::classifier::Classifier;
use super::{build_http_client, decode_json};
use crate::error::ClassifyError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use stylo_common::{Aspect, Classification, ClassificationTask, Emotion};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

const ASPECT_INSTRUCTIONS: &[&str] = &["Classify this paragraph into one of the following aspects:"];

const EMOTION_INSTRUCTIONS: &[&str] = &[
    "Classify the emotional tone of this paragraph into one of these emotions: \
     Joy, Sad, Powerful, Scared, Neutral, or Mad.",
    "Consider the overall mood, word choice, and context. Return only the emotion name.",
];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct GeminiClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    task: ClassificationTask,
    name: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    /// Emotion-label classifier
    pub fn emotions(config: GeminiConfig) -> Result<Self, ClassifyError> {
        Self::new(config, ClassificationTask::EmotionLabel, "gemini")
    }

    /// Narrative-aspect classifier
    pub fn aspects(config: GeminiConfig) -> Result<Self, ClassifyError> {
        Self::new(config, ClassificationTask::Aspect, "gemini-aspect")
    }

    fn new(
        config: GeminiConfig,
        task: ClassificationTask,
        name: &'static str,
    ) -> Result<Self, ClassifyError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http_client: build_http_client(config.timeout)?,
            url,
            api_key: config.api_key,
            task,
            name,
        })
    }

    fn request_body(&self, paragraph: &str) -> Value {
        let (instructions, labels): (&[&str], Vec<&str>) = match self.task {
            ClassificationTask::Aspect => (
                ASPECT_INSTRUCTIONS,
                Aspect::KNOWN.iter().map(|a| a.as_str()).collect(),
            ),
            _ => (
                EMOTION_INSTRUCTIONS,
                // Peaceful is not offered to the model
                Emotion::KNOWN
                    .iter()
                    .filter(|e| **e != Emotion::Peaceful)
                    .map(|e| e.as_str())
                    .collect(),
            ),
        };

        let mut parts: Vec<Value> = instructions.iter().map(|t| json!({"text": t})).collect();
        parts.push(json!({"text": paragraph}));

        json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": {
                "responseMimeType": "text/x.enum",
                "responseSchema": {"type": "STRING", "enum": labels},
            },
        })
    }

    fn parse_label(&self, label: &str) -> Result<Classification, ClassifyError> {
        let label = label.trim();
        let parsed = match self.task {
            ClassificationTask::Aspect => Aspect::parse_known(label).map(Classification::Aspect),
            _ => Emotion::parse_known(label).map(Classification::Emotion),
        };
        parsed.ok_or_else(|| ClassifyError::InvalidResponse(format!("Unknown label: {:?}", label)))
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    fn name(&self) -> &str {
        self.name
    }

    fn task(&self) -> ClassificationTask {
        self.task
    }

    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError> {
        let response = self
            .http_client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(paragraph))
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        let generated: GenerateResponse = decode_json(response).await?;

        // No candidate usually means the prompt was blocked by safety filters
        let text = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| ClassifyError::InvalidResponse("Response has no candidate text".into()))?;

        self.parse_label(&text)
    }
}
