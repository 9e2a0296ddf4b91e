//! Scripted classifiers and book fixtures

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stylo_classify::services::{
    Backoff, Classifier, RateLimitedClassifier, RetryPolicy, SlidingWindowLimiter,
};
use stylo_classify::ClassifyError;
use stylo_common::{Classification, ClassificationTask, Emotion};

/// Label derived from the paragraph text only
pub struct DeterministicClassifier;

#[async_trait]
impl Classifier for DeterministicClassifier {
    fn name(&self) -> &str {
        "deterministic"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError> {
        // Uneven delays so completion order differs from submission order
        let delay = (paragraph.len() % 7) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let label = Emotion::KNOWN[paragraph.len() % Emotion::KNOWN.len()];
        Ok(Classification::Emotion(label))
    }
}

/// Never answers
pub struct HangingClassifier;

#[async_trait]
impl Classifier for HangingClassifier {
    fn name(&self) -> &str {
        "hanging"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, _paragraph: &str) -> Result<Classification, ClassifyError> {
        std::future::pending().await
    }
}

/// Always fails with the given error
pub struct FailingClassifier(pub ClassifyError);

#[async_trait]
impl Classifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, _paragraph: &str) -> Result<Classification, ClassifyError> {
        Err(self.0.clone())
    }
}

/// Records the highest number of calls in flight at once
#[derive(Default)]
pub struct ConcurrencyGauge {
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Classifier for ConcurrencyGauge {
    fn name(&self) -> &str {
        "gauge"
    }

    fn task(&self) -> ClassificationTask {
        ClassificationTask::EmotionLabel
    }

    async fn classify(&self, _paragraph: &str) -> Result<Classification, ClassifyError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(10)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Classification::Emotion(Emotion::Neutral))
    }
}

/// Wrap a scripted classifier with generous rate limits
pub fn wrap(
    inner: Arc<dyn Classifier>,
    max_concurrency: usize,
    max_attempts: u32,
    request_timeout: Duration,
) -> Arc<RateLimitedClassifier> {
    Arc::new(RateLimitedClassifier::new(
        inner,
        Arc::new(SlidingWindowLimiter::new(10_000, Duration::from_secs(1))),
        max_concurrency,
        RetryPolicy {
            max_attempts,
            backoff: Backoff::Fixed(Duration::from_millis(1)),
        },
        request_timeout,
    ))
}

/// Book with `chapters` chapters of `paragraphs` paragraphs, each over 50 characters
pub fn book_text(chapters: usize, paragraphs: usize) -> String {
    let mut text = String::from("A Title Page\n\n");
    for c in 1..=chapters {
        text.push_str(&format!("CHAPTER {}\n\n", c));
        for p in 1..=paragraphs {
            text.push_str(&format!(
                "Paragraph {} of chapter {} tells a story long enough to be classified{}.\n\n",
                p,
                c,
                "!".repeat(p % 5)
            ));
        }
    }
    text
}
