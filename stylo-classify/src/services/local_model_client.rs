//! Local emotion model client
//!
//! Talks to a text-classification inference server (Hugging Face style):
//! `POST {url}` with `{"inputs": "<paragraph>"}` answering `[{"label", "score"}]`
//! (optionally nested one level). The highest-scoring label is mapped onto the
//! emotion set; a label outside the mapping is an invalid response.

use super::classifier::Classifier;
use super::{build_http_client, decode_json};
use crate::error::ClassifyError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use stylo_common::{Classification, ClassificationTask, Emotion};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8080/classify";

#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    pub url: String,
    pub timeout: Duration,
}

pub struct LocalModelClient {
    http_client: reqwest::Client,
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelOutput {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

impl ModelOutput {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            ModelOutput::Flat(scores) => scores,
            ModelOutput::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
        }
    }
}

/// Model vocabulary → emotion set
pub fn map_model_label(label: &str) -> Option<Emotion> {
    match label {
        "joy" | "surprise" => Some(Emotion::Joy),
        "sadness" => Some(Emotion::Sad),
        "anger" | "disgust" => Some(Emotion::Mad),
        "fear" => Some(Emotion::Scared),
        "neutral" => Some(Emotion::Neutral),
        _ => None,
    }
}

impl LocalModelClient {
    pub fn new(config: LocalModelConfig) -> Result<Self, ClassifyError> {
        Ok(Self {
            http_client: build_http_client(config.timeout)?,
            url: config.url,
        })
    }
}

#[async_trait]
impl Classifier for LocalModelClient {
    fn name(&self) -> &str {
        "local-model"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&json!({"inputs": paragraph}))
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        let output: ModelOutput = decode_json(response).await?;
        let best = output
            .into_scores()
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| ClassifyError::InvalidResponse("Model returned no labels".into()))?;

        map_model_label(&best.label)
            .map(Classification::Emotion)
            .ok_or_else(|| ClassifyError::InvalidResponse(format!("Unmapped model label: {:?}", best.label)))
    }
}
