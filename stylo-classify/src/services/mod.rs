//! Classification services
//!
//! - `rate_limiter`: sliding-window admission control shared by all workers
//! - `classifier`: the `Classifier` capability and the retrying wrapper
//! - provider clients: Azure OpenAI, Gemini, Hume batch API, local model server

pub mod classifier;
pub mod gemini_client;
pub mod hume_client;
pub mod local_model_client;
pub mod openai_client;
pub mod rate_limiter;

pub use classifier::{
    Backoff, ClassificationOutcome, Classifier, RateLimitedClassifier, RetryPolicy,
};
pub use gemini_client::{GeminiClient, GeminiConfig};
pub use hume_client::{HumeClient, HumeConfig};
pub use local_model_client::{LocalModelClient, LocalModelConfig};
pub use openai_client::{AzureOpenAiClient, AzureOpenAiConfig};
pub use rate_limiter::SlidingWindowLimiter;

use crate::error::ClassifyError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client shared by the provider implementations
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClassifyError> {
    reqwest::Client::builder()
        .user_agent(stylo_common::config::get_user_agent())
        .timeout(timeout)
        .build()
        .map_err(|e| ClassifyError::Service(format!("Failed to create HTTP client: {}", e)))
}

/// Check the status and decode a JSON body onto the service error taxonomy
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClassifyError> {
    let status = response.status();
    let body = response.text().await.map_err(ClassifyError::from_reqwest)?;

    if !status.is_success() {
        return Err(ClassifyError::from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        ClassifyError::InvalidResponse(format!("Failed to parse response body: {}", e))
    })
}
