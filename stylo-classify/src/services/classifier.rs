//! Classification capability and the retrying, rate-limited client around it
//!
//! Provider clients implement [`Classifier`] and only know how to turn one
//! paragraph into one [`Classification`]. [`RateLimitedClassifier`] wraps any of
//! them with the shared sliding-window limiter, a concurrency gate, a per-call
//! timeout and the retry policy. It never fails: once the attempts are used up
//! it hands back the task's sentinel together with the last error.

use super::rate_limiter::SlidingWindowLimiter;
use crate::error::{ClassifyError, PipelineError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use stylo_common::{Classification, ClassificationTask};
use tokio::sync::Semaphore;

/// A classification service
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Kind of result this classifier produces
    fn task(&self) -> ClassificationTask;

    /// Classify one paragraph
    async fn classify(&self, paragraph: &str) -> Result<Classification, ClassifyError>;
}

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `initial`, `2 * initial`, `4 * initial`, ... capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the `failed_attempt`-th failure (1-based)
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let shift = failed_attempt.saturating_sub(1).min(31);
                initial.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(2)),
        }
    }
}

/// Result of classifying one paragraph through [`RateLimitedClassifier`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    pub classification: Classification,
    pub attempts: u32,
    /// Last error when the sentinel was substituted
    pub failure: Option<ClassifyError>,
}

impl ClassificationOutcome {
    pub fn is_sentinel(&self) -> bool {
        self.failure.is_some()
    }

    /// Why the sentinel was written, in pipeline terms
    pub fn error(&self) -> Option<PipelineError> {
        self.failure
            .clone()
            .map(|last| PipelineError::unavailable(self.attempts, last))
    }
}

/// Retrying client enforcing rate, concurrency and per-call timeout
pub struct RateLimitedClassifier {
    inner: Arc<dyn Classifier>,
    limiter: Arc<SlidingWindowLimiter>,
    gate: Arc<Semaphore>,
    max_concurrency: usize,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl RateLimitedClassifier {
    pub fn new(
        inner: Arc<dyn Classifier>,
        limiter: Arc<SlidingWindowLimiter>,
        max_concurrency: usize,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            inner,
            limiter,
            gate: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.max(1),
                ..retry
            },
            request_timeout,
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn task(&self) -> ClassificationTask {
        self.inner.task()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    /// Classify with retries; falls back to the sentinel instead of failing
    pub async fn classify(&self, paragraph: &str) -> ClassificationOutcome {
        let task = self.inner.task();
        let max_attempts = self.retry.max_attempts;
        let mut last_error = ClassifyError::Service("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            match self.attempt(paragraph, task).await {
                Ok(classification) => {
                    if attempt > 1 {
                        tracing::debug!(
                            classifier = self.inner.name(),
                            attempt,
                            "Classification succeeded after retry"
                        );
                    }
                    return ClassificationOutcome {
                        classification,
                        attempts: attempt,
                        failure: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        classifier = self.inner.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Classification attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.backoff.delay(attempt)).await;
            }
        }

        tracing::warn!(
            classifier = self.inner.name(),
            attempts = max_attempts,
            error = %last_error,
            "Classification unavailable, substituting sentinel"
        );

        ClassificationOutcome {
            classification: task.sentinel(),
            attempts: max_attempts,
            failure: Some(last_error),
        }
    }

    async fn attempt(
        &self,
        paragraph: &str,
        task: ClassificationTask,
    ) -> Result<Classification, ClassifyError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ClassifyError::Service(e.to_string()))?;

        self.limiter.acquire().await;

        let classification =
            match tokio::time::timeout(self.request_timeout, self.inner.classify(paragraph)).await {
                Ok(result) => result?,
                Err(_) => return Err(ClassifyError::Timeout),
            };

        if classification.task() != task {
            return Err(ClassifyError::InvalidResponse(format!(
                "{} returned a {:?} result for a {:?} task",
                self.inner.name(),
                classification.task(),
                task
            )));
        }
        if classification.is_sentinel() {
            return Err(ClassifyError::InvalidResponse(
                "service returned no usable label".to_string(),
            ));
        }

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stylo_common::Emotion;

    /// Fails `failures` times, then returns Joy
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Classifier for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn task(&self) -> ClassificationTask {
            ClassificationTask::EmotionLabel
        }

        async fn classify(&self, _paragraph: &str) -> Result<Classification, ClassifyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ClassifyError::Service("boom".into()))
            } else {
                Ok(Classification::Emotion(Emotion::Joy))
            }
        }
    }

    fn wrap(inner: Arc<dyn Classifier>, max_attempts: u32) -> RateLimitedClassifier {
        RateLimitedClassifier::new(
            inner,
            Arc::new(SlidingWindowLimiter::new(100, Duration::from_secs(1))),
            4,
            RetryPolicy {
                max_attempts,
                backoff: Backoff::Fixed(Duration::from_secs(2)),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(16),
        };
        let delays: Vec<u64> = (1..=5).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 16]);
        assert_eq!(backoff.delay(200), Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let flaky = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let client = wrap(flaky.clone(), 3);

        let start = tokio::time::Instant::now();
        let outcome = client.classify("paragraph").await;

        assert_eq!(outcome.classification, Classification::Emotion(Emotion::Joy));
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.is_sentinel());
        assert!(outcome.error().is_none());
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_give_sentinel() {
        let flaky = Arc::new(Flaky {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let client = wrap(flaky.clone(), 2);

        let outcome = client.classify("paragraph").await;

        assert_eq!(outcome.classification, Classification::Emotion(Emotion::Unknown));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.failure, Some(ClassifyError::Service("boom".into())));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            outcome.error(),
            Some(PipelineError::ClassificationFailed { attempts: 2, .. })
        ));
    }

    struct WrongTask;

    #[async_trait]
    impl Classifier for WrongTask {
        fn name(&self) -> &str {
            "wrong"
        }

        fn task(&self) -> ClassificationTask {
            ClassificationTask::Aspect
        }

        async fn classify(&self, _paragraph: &str) -> Result<Classification, ClassifyError> {
            Ok(Classification::Emotion(Emotion::Joy))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_result_kind_is_invalid() {
        let client = wrap(Arc::new(WrongTask), 1);
        let outcome = client.classify("p").await;

        assert!(matches!(outcome.failure, Some(ClassifyError::InvalidResponse(_))));
        assert!(outcome.classification.is_sentinel());
    }
}
