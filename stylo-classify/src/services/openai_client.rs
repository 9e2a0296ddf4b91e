//! Azure OpenAI chat-completions client (emotion label)
//!
//! The model is asked for a JSON object `{"emotion": "<label>"}`; the label must
//! be one of the known emotions, matched exactly.

use super::classifier::Classifier;
use super::{build_http_client, decode_json};
use crate::error::ClassifyError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use stylo_common::{Classification, ClassificationTask, Emotion};

pub const DEFAULT_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

const SYSTEM_PROMPT: &str = "Classify the emotional tone of the paragraph into one of these \
emotions: Joy, Sad, Powerful, Neutral, Scared, or Mad.\n\
Return your response in JSON format like this: {\"emotion\": \"Joy\"}\n\
Use only the exact emotion names provided.";

#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct AzureOpenAiClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmotionPayload {
    emotion: String,
}

impl AzureOpenAiClient {
    pub fn new(config: AzureOpenAiConfig) -> Result<Self, ClassifyError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.deployment,
            config.api_version
        );

        Ok(Self {
            http_client: build_http_client(config.timeout)?,
            url,
            api_key: config.api_key,
        })
    }

    fn parse_content(content: &str) -> Result<Emotion, ClassifyError> {
        let payload: EmotionPayload = serde_json::from_str(content).map_err(|e| {
            ClassifyError::InvalidResponse(format!("Expected {{\"emotion\": ..}}, got {:?}: {}", content, e))
        })?;

        Emotion::parse_known(payload.emotion.trim()).ok_or_else(|| {
            ClassifyError::InvalidResponse(format!("Unknown emotion label: {:?}", payload.emotion))
        })
    }
}

#[async_trait]
impl Classifier for AzureOpenAiClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError> {
        let body = json!({
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": paragraph},
            ],
            "max_tokens": 50,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .http_client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        let chat: ChatResponse = decode_json(response).await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::InvalidResponse("Response has no message content".into()))?;

        tracing::trace!(content = %content, "Azure OpenAI response");
        Ok(Classification::Emotion(Self::parse_content(&content)?))
    }
}
