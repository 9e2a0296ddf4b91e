//! Hume batch expression-measurement client (emotion intensities)
//!
//! One paragraph is one batch job:
//! 1. `POST /v0/batch/jobs` with the text and the sentence-granularity language model
//! 2. poll `GET /v0/batch/jobs/{id}` until `COMPLETED` or `FAILED`, sleeping
//!    1 s, 2 s, 4 s ... (capped) between polls, under an overall poll budget
//! 3. `GET /v0/batch/jobs/{id}/predictions`
//!
//! The paragraph's intensity for an emotion is the mean of its per-sentence
//! scores, clamped to [0, 1].

use super::classifier::Classifier;
use super::{build_http_client, decode_json};
use crate::error::ClassifyError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use stylo_common::{Classification, ClassificationTask};
use tokio::time::Instant;

pub const DEFAULT_BASE_URL: &str = "https://api.hume.ai";
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_MAX_DELAY: Duration = Duration::from_secs(16);
const INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct HumeConfig {
    pub base_url: String,
    pub api_key: String,
    /// Overall time allowed for the job to reach a terminal status
    pub poll_timeout: Duration,
    pub poll_max_delay: Duration,
    /// Timeout for each individual HTTP request
    pub request_timeout: Duration,
}

pub struct HumeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_timeout: Duration,
    poll_max_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    state: JobState,
}

#[derive(Debug, Deserialize)]
struct JobState {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourcePredictions {
    results: Option<Results>,
}

#[derive(Debug, Deserialize)]
struct Results {
    #[serde(default)]
    predictions: Vec<FilePrediction>,
}

#[derive(Debug, Deserialize)]
struct FilePrediction {
    models: Models,
}

#[derive(Debug, Deserialize)]
struct Models {
    language: Option<ModelPredictions>,
}

#[derive(Debug, Deserialize)]
struct ModelPredictions {
    #[serde(default)]
    grouped_predictions: Vec<GroupedPredictions>,
}

#[derive(Debug, Deserialize)]
struct GroupedPredictions {
    #[serde(default)]
    predictions: Vec<SentencePrediction>,
}

#[derive(Debug, Deserialize)]
struct SentencePrediction {
    #[serde(default)]
    emotions: Vec<EmotionScore>,
}

#[derive(Debug, Deserialize)]
struct EmotionScore {
    name: String,
    score: f64,
}

impl HumeClient {
    pub fn new(config: HumeConfig) -> Result<Self, ClassifyError> {
        Ok(Self {
            http_client: build_http_client(config.request_timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            poll_timeout: config.poll_timeout,
            poll_max_delay: config.poll_max_delay,
        })
    }

    async fn start_job(&self, paragraph: &str) -> Result<String, ClassifyError> {
        let body = json!({
            "text": [paragraph],
            "models": {"language": {"granularity": "sentence"}},
        });

        let response = self
            .http_client
            .post(format!("{}/v0/batch/jobs", self.base_url))
            .header("X-Hume-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        let created: JobCreated = decode_json(response).await?;
        Ok(created.job_id)
    }

    /// Poll until the job completes; the delay doubles up to `poll_max_delay`
    async fn wait_for_completion(&self, job_id: &str) -> Result<(), ClassifyError> {
        let started = Instant::now();
        let mut delay = INITIAL_POLL_DELAY.min(self.poll_max_delay);

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.poll_timeout {
                tracing::warn!(job_id, elapsed_ms = elapsed.as_millis() as u64, "Hume job polling abandoned");
                return Err(ClassifyError::Timeout);
            }

            tokio::time::sleep(delay.min(self.poll_timeout - elapsed)).await;

            let response = self
                .http_client
                .get(format!("{}/v0/batch/jobs/{}", self.base_url, job_id))
                .header("X-Hume-Api-Key", &self.api_key)
                .send()
                .await
                .map_err(ClassifyError::from_reqwest)?;

            let details: JobDetails = decode_json(response).await?;
            match details.state.status.as_str() {
                "COMPLETED" => return Ok(()),
                "FAILED" => {
                    return Err(ClassifyError::Service(format!(
                        "Hume job {} failed: {}",
                        job_id,
                        details.state.message.unwrap_or_default()
                    )))
                }
                status => {
                    tracing::trace!(job_id, status, "Hume job pending");
                }
            }

            delay = (delay * 2).min(self.poll_max_delay);
        }
    }

    async fn fetch_predictions(&self, job_id: &str) -> Result<Vec<SourcePredictions>, ClassifyError> {
        let response = self
            .http_client
            .get(format!("{}/v0/batch/jobs/{}/predictions", self.base_url, job_id))
            .header("X-Hume-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(ClassifyError::from_reqwest)?;

        decode_json(response).await
    }

    /// Mean score per emotion over all sentences, clamped to [0, 1]
    fn average_intensities(sources: &[SourcePredictions]) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();

        let sentences = sources
            .iter()
            .filter_map(|s| s.results.as_ref())
            .flat_map(|r| r.predictions.iter())
            .filter_map(|p| p.models.language.as_ref())
            .flat_map(|l| l.grouped_predictions.iter())
            .flat_map(|g| g.predictions.iter());

        for sentence in sentences {
            for emotion in &sentence.emotions {
                let entry = sums.entry(emotion.name.clone()).or_insert((0.0, 0));
                entry.0 += emotion.score;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(name, (sum, n))| (name, (sum / n as f64).clamp(0.0, 1.0)))
            .collect()
    }
}

#[async_trait]
impl Classifier for HumeClient {
    fn name(&self) -> &str {
        "hume"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionIntensity
    }

    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError> {
        let job_id = self.start_job(paragraph).await?;
        tracing::debug!(job_id = %job_id, "Hume job started");

        self.wait_for_completion(&job_id).await?;
        let sources = self.fetch_predictions(&job_id).await?;

        let intensities = Self::average_intensities(&sources);
        if intensities.is_empty() {
            return Err(ClassifyError::InvalidResponse(format!(
                "Hume job {} returned no emotion predictions",
                job_id
            )));
        }

        Ok(Classification::Emotions(intensities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_sentences() {
        let raw = json!([{
            "results": {"predictions": [{"models": {"language": {"grouped_predictions": [{
                "predictions": [
                    {"emotions": [{"name": "Joy", "score": 0.8}, {"name": "Awe", "score": 0.2}]},
                    {"emotions": [{"name": "Joy", "score": 0.4}, {"name": "Awe", "score": 2.4}]}
                ]
            }]}}}]}
        }]);
        let sources: Vec<SourcePredictions> = serde_json::from_value(raw).unwrap();
        let intensities = HumeClient::average_intensities(&sources);

        assert!((intensities["Joy"] - 0.6).abs() < 1e-9);
        assert_eq!(intensities["Awe"], 1.0);
    }

    #[test]
    fn test_missing_results_give_empty_map() {
        let sources: Vec<SourcePredictions> =
            serde_json::from_value(json!([{"results": null}])).unwrap();
        assert!(HumeClient::average_intensities(&sources).is_empty());
    }
}
