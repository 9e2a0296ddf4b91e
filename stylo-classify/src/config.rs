//! Runtime configuration for stylo-classify
//!
//! **Priority:** CLI → ENV → TOML → built-in provider defaults.
//!
//! Each provider brings its own rate, concurrency, retry and timeout defaults;
//! the `[limits]` TOML section overrides them for whichever provider runs.

use crate::segmenter::{SegmenterConfig, DEFAULT_MARKER, DEFAULT_MIN_PARAGRAPH_CHARS};
use crate::services::{
    gemini_client, hume_client, local_model_client, openai_client, AzureOpenAiClient,
    AzureOpenAiConfig, Backoff, Classifier, GeminiClient, GeminiConfig, HumeClient, HumeConfig,
    LocalModelClient, LocalModelConfig, RateLimitedClassifier, RetryPolicy, SlidingWindowLimiter,
};
use crate::workflow::checkpoint::DEFAULT_INTERVAL;
use crate::workflow::PipelineConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stylo_common::config::TomlConfig;
use stylo_common::{ClassificationTask, Error, Result};
use tracing::{info, warn};

pub const OPENAI_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const OPENAI_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const HUME_KEY_ENV: &str = "HUME_API_KEY";

pub const DEFAULT_INPUT_DIR: &str = "books";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Classification backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Provider {
    /// Azure OpenAI chat completions, emotion label
    #[value(name = "openai")]
    OpenAi,
    /// Gemini, emotion label
    Gemini,
    /// Gemini, narrative aspect
    GeminiAspect,
    /// Hume batch API, emotion intensities
    Hume,
    /// Local text-classification server, emotion label
    Local,
}

/// Built-in limits for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub max_requests: usize,
    pub window: Duration,
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    /// Per-call deadline
    pub request_timeout: Duration,
}

impl Provider {
    pub fn task(&self) -> ClassificationTask {
        match self {
            Provider::GeminiAspect => ClassificationTask::Aspect,
            Provider::Hume => ClassificationTask::EmotionIntensity,
            Provider::OpenAi | Provider::Gemini | Provider::Local => ClassificationTask::EmotionLabel,
        }
    }

    pub fn default_limits(&self) -> Limits {
        let per_minute = |max_requests: usize| (max_requests, Duration::from_secs(60));
        let per_second = |max_requests: usize| (max_requests, Duration::from_secs(1));

        let ((max_requests, window), max_concurrency, max_attempts, backoff, timeout_secs) =
            match self {
                Provider::OpenAi => (
                    per_minute(500),
                    10,
                    3,
                    Backoff::Exponential {
                        initial: Duration::from_secs(2),
                        max: Duration::from_secs(16),
                    },
                    30,
                ),
                Provider::Gemini => (per_minute(500), 10, 3, Backoff::Fixed(Duration::from_secs(2)), 5),
                Provider::GeminiAspect => {
                    (per_minute(500), 10, 1, Backoff::Fixed(Duration::from_secs(2)), 30)
                }
                // Covers job start, the poll budget and the predictions fetch
                Provider::Hume => (per_second(50), 5, 1, Backoff::Fixed(Duration::from_secs(2)), 150),
                Provider::Local => (per_second(100), 1, 1, Backoff::Fixed(Duration::from_secs(1)), 30),
            };

        Limits {
            max_requests,
            window,
            max_concurrency,
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Chapters shorter than this are not classified
    pub fn default_min_chapter_chars(&self) -> usize {
        match self {
            Provider::Hume => 0,
            _ => 1000,
        }
    }

    pub fn output_suffix(&self) -> &'static str {
        match self {
            Provider::OpenAi => "emotions_gpt",
            Provider::Gemini => "emotions_gemini",
            Provider::GeminiAspect => "classifications",
            Provider::Hume => "emotions_hume",
            Provider::Local => "emotions_oss",
        }
    }
}

/// Values given on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub checkpoint_interval: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub min_chapter_chars: Option<usize>,
}

/// Fully resolved settings for a classification run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub provider: Provider,
    pub input_dir: PathBuf,
    pub limits: Limits,
    pub pipeline: PipelineConfig,
}

/// Segmentation settings a run with `provider` would use
///
/// `min_chapter_chars` is the command-line value, if any.
pub fn resolve_segmenter_config(
    provider: Provider,
    toml: &TomlConfig,
    min_chapter_chars: Option<usize>,
) -> SegmenterConfig {
    SegmenterConfig {
        marker: toml
            .segmenter
            .marker
            .clone()
            .unwrap_or_else(|| DEFAULT_MARKER.to_string()),
        min_chapter_chars: min_chapter_chars
            .or(toml.segmenter.min_chapter_chars)
            .unwrap_or_else(|| provider.default_min_chapter_chars()),
        min_paragraph_chars: toml
            .segmenter
            .min_paragraph_chars
            .unwrap_or(DEFAULT_MIN_PARAGRAPH_CHARS),
    }
}

/// Merge CLI overrides, TOML and provider defaults
pub fn resolve_run_config(
    provider: Provider,
    toml: &TomlConfig,
    overrides: &RunOverrides,
) -> RunConfig {
    let mut limits = provider.default_limits();
    let l = &toml.limits;

    if let Some(n) = l.max_requests {
        limits.max_requests = n;
    }
    if let Some(ms) = l.window_ms {
        limits.window = Duration::from_millis(ms);
    }
    if let Some(n) = overrides.max_concurrency.or(l.max_concurrency) {
        limits.max_concurrency = n;
    }
    if let Some(n) = l.max_attempts {
        limits.retry.max_attempts = n;
    }
    if let Some(ms) = l.request_timeout_ms {
        limits.request_timeout = Duration::from_millis(ms);
    }
    limits.retry.backoff = resolve_backoff(limits.retry.backoff, l);

    let pipeline = PipelineConfig {
        segmenter: resolve_segmenter_config(provider, toml, overrides.min_chapter_chars),
        output_dir: overrides
            .output_dir
            .clone()
            .or_else(|| toml.paths.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        output_suffix: provider.output_suffix().to_string(),
        checkpoint_interval: overrides
            .checkpoint_interval
            .or(toml.checkpoint.interval)
            .unwrap_or(DEFAULT_INTERVAL),
        keep_snapshots: toml.checkpoint.keep_snapshots.unwrap_or(true),
        ..PipelineConfig::default()
    };

    RunConfig {
        provider,
        input_dir: overrides
            .input_dir
            .clone()
            .or_else(|| toml.paths.input_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
        limits,
        pipeline,
    }
}

fn resolve_backoff(default: Backoff, l: &stylo_common::config::LimitsSection) -> Backoff {
    let (default_initial, default_max, default_exponential) = match default {
        Backoff::Fixed(d) => (d, d, false),
        Backoff::Exponential { initial, max } => (initial, max, true),
    };

    let initial = l.backoff_ms.map(Duration::from_millis).unwrap_or(default_initial);
    let max = l.backoff_max_ms.map(Duration::from_millis).unwrap_or(default_max.max(initial));

    if l.exponential.unwrap_or(default_exponential) {
        Backoff::Exponential { initial, max }
    } else {
        Backoff::Fixed(initial)
    }
}

/// Resolve an API key: ENV → TOML
///
/// Warns when both are set; fails when neither is.
pub fn resolve_api_key(provider_label: &str, env_var: &str, toml_key: Option<&str>) -> Result<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in multiple sources: environment, TOML. Using environment (highest priority).",
            provider_label
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider_label);
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider_label);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Set {} or add api_key to the TOML config.",
        provider_label, env_var
    )))
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Construct the provider client wrapped in the shared limiter and retry policy
pub fn build_classifier(run: &RunConfig, toml: &TomlConfig) -> Result<Arc<RateLimitedClassifier>> {
    let timeout = run.limits.request_timeout;
    let to_config_error = |e: crate::error::ClassifyError| Error::Config(e.to_string());

    let inner: Arc<dyn Classifier> = match run.provider {
        Provider::OpenAi => {
            let section = toml.openai.clone().unwrap_or_default();
            let endpoint = std::env::var(OPENAI_ENDPOINT_ENV)
                .ok()
                .filter(|e| !e.trim().is_empty())
                .or(section.endpoint)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Azure OpenAI endpoint not configured. Set {} or [openai] endpoint.",
                        OPENAI_ENDPOINT_ENV
                    ))
                })?;

            Arc::new(
                AzureOpenAiClient::new(AzureOpenAiConfig {
                    endpoint,
                    deployment: section
                        .deployment
                        .unwrap_or_else(|| openai_client::DEFAULT_DEPLOYMENT.to_string()),
                    api_version: section
                        .api_version
                        .unwrap_or_else(|| openai_client::DEFAULT_API_VERSION.to_string()),
                    api_key: resolve_api_key("Azure OpenAI", OPENAI_KEY_ENV, section.api_key.as_deref())?,
                    timeout,
                })
                .map_err(to_config_error)?,
            )
        }
        Provider::Gemini | Provider::GeminiAspect => {
            let section = toml.gemini.clone().unwrap_or_default();
            let config = GeminiConfig {
                base_url: section
                    .base_url
                    .unwrap_or_else(|| gemini_client::DEFAULT_BASE_URL.to_string()),
                model: section
                    .model
                    .unwrap_or_else(|| gemini_client::DEFAULT_MODEL.to_string()),
                api_key: resolve_api_key("Gemini", GEMINI_KEY_ENV, section.api_key.as_deref())?,
                timeout,
            };
            let client = if run.provider == Provider::GeminiAspect {
                GeminiClient::aspects(config)
            } else {
                GeminiClient::emotions(config)
            };
            Arc::new(client.map_err(to_config_error)?)
        }
        Provider::Hume => {
            let section = toml.hume.clone().unwrap_or_default();
            Arc::new(
                HumeClient::new(HumeConfig {
                    base_url: section
                        .base_url
                        .unwrap_or_else(|| hume_client::DEFAULT_BASE_URL.to_string()),
                    api_key: resolve_api_key("Hume", HUME_KEY_ENV, section.api_key.as_deref())?,
                    poll_timeout: section
                        .poll_timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or(hume_client::DEFAULT_POLL_TIMEOUT),
                    poll_max_delay: section
                        .poll_max_delay_ms
                        .map(Duration::from_millis)
                        .unwrap_or(hume_client::DEFAULT_POLL_MAX_DELAY),
                    request_timeout: Duration::from_secs(30).min(timeout),
                })
                .map_err(to_config_error)?,
            )
        }
        Provider::Local => {
            let section = toml.local_model.clone().unwrap_or_default();
            Arc::new(
                LocalModelClient::new(LocalModelConfig {
                    url: section
                        .url
                        .unwrap_or_else(|| local_model_client::DEFAULT_URL.to_string()),
                    timeout,
                })
                .map_err(to_config_error)?,
            )
        }
    };

    let limiter = Arc::new(SlidingWindowLimiter::new(
        run.limits.max_requests,
        run.limits.window,
    ));

    info!(
        classifier = inner.name(),
        max_requests = run.limits.max_requests,
        window_ms = run.limits.window.as_millis() as u64,
        max_concurrency = run.limits.max_concurrency,
        max_attempts = run.limits.retry.max_attempts,
        "Classifier configured"
    );

    Ok(Arc::new(RateLimitedClassifier::new(
        inner,
        limiter,
        run.limits.max_concurrency,
        run.limits.retry,
        run.limits.request_timeout,
    )))
}
