//! Provider clients against an in-process mock HTTP server

mod helpers;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use helpers::spawn_mock_server;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stylo_classify::services::{
    AzureOpenAiClient, AzureOpenAiConfig, Backoff, Classifier, GeminiClient, GeminiConfig,
    HumeClient, HumeConfig, LocalModelClient, LocalModelConfig, RateLimitedClassifier,
    RetryPolicy, SlidingWindowLimiter,
};
use stylo_classify::ClassifyError;
use stylo_common::{Aspect, Classification, Emotion};

fn openai(base_url: &str) -> AzureOpenAiClient {
    AzureOpenAiClient::new(AzureOpenAiConfig {
        endpoint: base_url.to_string(),
        deployment: "gpt-4o".to_string(),
        api_version: "2024-08-01-preview".to_string(),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn chat_reply(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

#[tokio::test]
async fn test_openai_parses_emotion() {
    let router = Router::new().route(
        "/openai/deployments/:deployment/chat/completions",
        post(
            |Path(deployment): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(deployment, "gpt-4o");
                assert_eq!(headers["api-key"], "test-key");
                assert_eq!(body["response_format"]["type"], "json_object");
                assert_eq!(body["messages"][1]["content"], "The rain would not stop.");
                Json(chat_reply(r#"{"emotion": "Sad"}"#))
            },
        ),
    );
    let base = spawn_mock_server(router).await;

    let result = openai(&base).classify("The rain would not stop.").await;
    assert_eq!(result, Ok(Classification::Emotion(Emotion::Sad)));
}

#[tokio::test]
async fn test_openai_429_is_rate_limited() {
    let router = Router::new().route(
        "/openai/deployments/:deployment/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = spawn_mock_server(router).await;

    let result = openai(&base).classify("p").await;
    assert_eq!(result, Err(ClassifyError::RateLimited));
}

#[tokio::test]
async fn test_openai_label_outside_set_is_invalid() {
    let router = Router::new().route(
        "/openai/deployments/:deployment/chat/completions",
        post(|| async { Json(chat_reply(r#"{"emotion": "Melancholy"}"#)) }),
    );
    let base = spawn_mock_server(router).await;

    let result = openai(&base).classify("p").await;
    assert!(matches!(result, Err(ClassifyError::InvalidResponse(_))));
}

fn gemini_config(base_url: &str) -> GeminiConfig {
    GeminiConfig {
        base_url: base_url.to_string(),
        model: "gemini-test".to_string(),
        api_key: "gem-key".to_string(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_gemini_aspect_label() {
    let router = Router::new().route(
        "/v1beta/models/:call",
        post(
            |Path(call): Path<String>,
             Query(query): Query<HashMap<String, String>>,
             Json(body): Json<Value>| async move {
                assert_eq!(call, "gemini-test:generateContent");
                assert_eq!(query.get("key").map(String::as_str), Some("gem-key"));
                assert_eq!(body["generationConfig"]["responseMimeType"], "text/x.enum");
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": "Inner Thoughts"}]}}]
                }))
            },
        ),
    );
    let base = spawn_mock_server(router).await;

    let client = GeminiClient::aspects(gemini_config(&base)).unwrap();
    let result = client.classify("She wondered if he knew.").await;
    assert_eq!(result, Ok(Classification::Aspect(Aspect::InnerThoughts)));
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_invalid() {
    let router = Router::new().route(
        "/v1beta/models/:call",
        post(|| async { Json(json!({"promptFeedback": {"blockReason": "SAFETY"}})) }),
    );
    let base = spawn_mock_server(router).await;

    let client = GeminiClient::emotions(gemini_config(&base)).unwrap();
    let result = client.classify("p").await;
    assert!(matches!(result, Err(ClassifyError::InvalidResponse(_))));
}

fn hume_config(base_url: &str, poll_timeout: Duration) -> HumeConfig {
    HumeConfig {
        base_url: base_url.to_string(),
        api_key: "hume-key".to_string(),
        poll_timeout,
        poll_max_delay: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
    }
}

/// Hume mock whose job reports `statuses` in turn, then the last one forever
fn hume_router(statuses: &'static [&'static str]) -> (Router, Arc<AtomicUsize>) {
    let polls = Arc::new(AtomicUsize::new(0));
    let poll_counter = polls.clone();

    let router = Router::new()
        .route(
            "/v0/batch/jobs",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["x-hume-api-key"], "hume-key");
                assert_eq!(body["models"]["language"]["granularity"], "sentence");
                Json(json!({"job_id": "job-1"}))
            }),
        )
        .route(
            "/v0/batch/jobs/:id",
            get(move |Path(id): Path<String>| {
                let polls = poll_counter.clone();
                async move {
                    assert_eq!(id, "job-1");
                    let n = polls.fetch_add(1, Ordering::SeqCst);
                    let status = statuses[n.min(statuses.len() - 1)];
                    Json(json!({"job_id": id, "state": {"status": status}}))
                }
            }),
        )
        .route(
            "/v0/batch/jobs/:id/predictions",
            get(|| async {
                Json(json!([{
                    "source": {"type": "text"},
                    "results": {"predictions": [{"models": {"language": {"grouped_predictions": [{
                        "id": "unknown",
                        "predictions": [
                            {"text": "One.", "emotions": [{"name": "Joy", "score": 0.5}, {"name": "Calmness", "score": 0.1}]},
                            {"text": "Two.", "emotions": [{"name": "Joy", "score": 0.7}, {"name": "Calmness", "score": 0.3}]}
                        ]
                    }]}}}]}
                }]))
            }),
        );

    (router, polls)
}

#[tokio::test]
async fn test_hume_polls_until_completed() {
    let (router, polls) = hume_router(&["QUEUED", "IN_PROGRESS", "COMPLETED"]);
    let base = spawn_mock_server(router).await;

    let client = HumeClient::new(hume_config(&base, Duration::from_secs(10))).unwrap();
    let result = client.classify("One. Two.").await.unwrap();

    let Classification::Emotions(intensities) = result else {
        panic!("expected intensities");
    };
    assert!((intensities["Joy"] - 0.6).abs() < 1e-9);
    assert!((intensities["Calmness"] - 0.2).abs() < 1e-9);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_hume_failed_job_is_service_error() {
    let (router, _) = hume_router(&["FAILED"]);
    let base = spawn_mock_server(router).await;

    let client = HumeClient::new(hume_config(&base, Duration::from_secs(10))).unwrap();
    let result = client.classify("p").await;
    assert!(matches!(result, Err(ClassifyError::Service(msg)) if msg.contains("job-1")));
}

#[tokio::test]
async fn test_hume_poll_budget_exhausted_is_timeout() {
    let (router, polls) = hume_router(&["IN_PROGRESS"]);
    let base = spawn_mock_server(router).await;

    let client = HumeClient::new(hume_config(&base, Duration::from_millis(80))).unwrap();
    let result = client.classify("p").await;

    assert_eq!(result, Err(ClassifyError::Timeout));
    assert!(polls.load(Ordering::SeqCst) >= 1);
}

fn local(base_url: &str) -> LocalModelClient {
    LocalModelClient::new(LocalModelConfig {
        url: format!("{}/classify", base_url),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_local_model_top_label_mapped() {
    let router = Router::new().route(
        "/classify",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["inputs"], "He slammed the door.");
            Json(json!([[
                {"label": "joy", "score": 0.05},
                {"label": "anger", "score": 0.81},
                {"label": "sadness", "score": 0.14}
            ]]))
        }),
    );
    let base = spawn_mock_server(router).await;

    let result = local(&base).classify("He slammed the door.").await;
    assert_eq!(result, Ok(Classification::Emotion(Emotion::Mad)));
}

#[tokio::test]
async fn test_local_model_unmapped_label_is_invalid() {
    let router = Router::new().route(
        "/classify",
        post(|| async { Json(json!([{"label": "love", "score": 0.9}])) }),
    );
    let base = spawn_mock_server(router).await;

    let result = local(&base).classify("p").await;
    assert!(matches!(result, Err(ClassifyError::InvalidResponse(msg)) if msg.contains("love")));
}

#[tokio::test]
async fn test_unreachable_service_is_service_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = local(&format!("http://{}", addr)).classify("p").await;
    assert!(matches!(result, Err(ClassifyError::Service(_))));
}

#[tokio::test]
async fn test_retrying_wrapper_over_http_errors() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/classify",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
            }
        }),
    );
    let base = spawn_mock_server(router).await;

    let wrapped = RateLimitedClassifier::new(
        Arc::new(local(&base)),
        Arc::new(SlidingWindowLimiter::new(100, Duration::from_secs(1))),
        1,
        RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_millis(5)),
        },
        Duration::from_secs(5),
    );

    let outcome = wrapped.classify("p").await;
    assert_eq!(outcome.classification, Classification::Emotion(Emotion::Unknown));
    assert_eq!(outcome.attempts, 3);
    assert!(matches!(outcome.failure, Some(ClassifyError::Service(ref msg)) if msg.contains("500")));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
