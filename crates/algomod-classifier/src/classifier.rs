//! Severity-aware classifier (Stage 2)
//!
//! Wraps the inference backend with request shaping, output parsing, and
//! failure containment. Classification never fails the request path: every
//! call produces a result plus a status describing how it was obtained.

use crate::backend::InferenceBackend;
use crate::parser::{self, DEFAULT_CONFIDENCE};
use algomod_core::{Category, ClassificationResult, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// What to return when the model's answer cannot be trusted.
///
/// This is a deployment decision, not a hard-coded one: fail-safe treats
/// unreadable output as harmful (a moderation system that cannot read its
/// model must not silently pass content through), fail-open prefers
/// availability and returns safe with a degraded status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    FailSafe,
    FailOpen,
}

/// Classifier tuning knobs, wired from server configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Hard bound on one inference call
    pub request_timeout: Duration,

    /// Maximum in-flight inference calls. The backend model may be
    /// single-instance, in which case this must be 1.
    pub max_concurrent: usize,

    /// How long a request may wait for an inference slot before it is
    /// degraded instead of queued further
    pub queue_wait: Duration,

    pub fallback_policy: FallbackPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_concurrent: 1,
            queue_wait: Duration::from_secs(10),
            fallback_policy: FallbackPolicy::default(),
        }
    }
}

/// How the Stage 2 result was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage2Status {
    /// Model answered and the answer parsed
    Classified,
    /// Model answered but the fallback policy had to supply the verdict
    Fallback(String),
    /// Backend unreachable, saturated, or timed out
    Degraded(String),
}

impl Stage2Status {
    pub fn render(&self) -> String {
        match self {
            Self::Classified => "classified".to_string(),
            Self::Fallback(reason) => format!("fallback: {}", reason),
            Self::Degraded(reason) => format!("degraded: {}", reason),
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified)
    }
}

/// Stage 2 output: always a usable result, never an error
#[derive(Debug, Clone)]
pub struct ClassifiedOutcome {
    pub result: ClassificationResult,
    pub status: Stage2Status,
}

/// Stage 2 of the pipeline
pub struct SeverityClassifier {
    backend: Arc<dyn InferenceBackend>,
    limiter: Arc<Semaphore>,
    config: ClassifierConfig,
}

impl SeverityClassifier {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: ClassifierConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            backend,
            limiter,
            config,
        }
    }

    /// Classify normalized text.
    ///
    /// Infallible by contract: timeouts, transport failures, saturation, and
    /// unparseable output are all contained here and reported through the
    /// status, so moderation degrades gracefully instead of crashing the
    /// request path. Dropping the returned future cancels any in-flight
    /// backend call.
    pub async fn classify(&self, text: &str) -> ClassifiedOutcome {
        let _permit = match tokio::time::timeout(self.config.queue_wait, self.limiter.acquire()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return self.degraded("inference admission closed"),
            Err(_) => {
                tracing::warn!("inference slot not acquired within queue wait, degrading");
                return self.degraded("inference backend saturated");
            }
        };

        let prompt = build_prompt(text);
        match tokio::time::timeout(self.config.request_timeout, self.backend.generate(&prompt)).await
        {
            Err(_) => self.degraded(format!(
                "inference timed out after {}s",
                self.config.request_timeout.as_secs()
            )),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, backend = self.backend.name(), "inference call failed");
                self.degraded(e.to_string())
            }
            Ok(Ok(response)) => match parser::parse_output(&response.text) {
                Ok(mut result) => {
                    if let Some(confidence) = response.confidence {
                        result.confidence = confidence.clamp(0.0, 1.0);
                    }
                    ClassifiedOutcome {
                        result,
                        status: Stage2Status::Classified,
                    }
                }
                Err(e) => {
                    // Logged for offline review; the caller still gets a verdict.
                    tracing::warn!(error = %e, raw = %response.text, "applying fallback policy");
                    ClassifiedOutcome {
                        result: self.fallback_result(),
                        status: Stage2Status::Fallback(e.to_string()),
                    }
                }
            },
        }
    }

    /// Reachability of the underlying backend, for the health endpoint
    pub async fn backend_reachable(&self) -> bool {
        self.backend.probe().await
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn degraded(&self, reason: impl Into<String>) -> ClassifiedOutcome {
        ClassifiedOutcome {
            result: self.fallback_result(),
            status: Stage2Status::Degraded(reason.into()),
        }
    }

    fn fallback_result(&self) -> ClassificationResult {
        match self.config.fallback_policy {
            FallbackPolicy::FailSafe => {
                ClassificationResult::new(Category::Harmful, Severity::Extreme, DEFAULT_CONFIDENCE)
            }
            FallbackPolicy::FailOpen => ClassificationResult::safe(DEFAULT_CONFIDENCE),
        }
    }
}

/// Fixed instruction carrying the severity taxonomy, with the normalized
/// text spliced in
fn build_prompt(text: &str) -> String {
    format!(
        "Classify this text for content moderation. Give a short answer.\n\
         Respond as: <category>, severity: <0-3>\n\
         Categories: safe, profanity, harassment, hate_speech, self_harm, violence, sexual_content, spam.\n\
         Severity: 0 = safe, 1 = mildly harmful, 2 = harmful, 3 = extremely harmful.\n\n\
         Text: \"{}\"\n\
         Classification:",
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceResponse;
    use algomod_core::{Error, Result};
    use async_trait::async_trait;

    struct CannedBackend {
        reply: String,
        delay: Duration,
    }

    #[async_trait]
    impl InferenceBackend for CannedBackend {
        async fn generate(&self, _prompt: &str) -> Result<InferenceResponse> {
            tokio::time::sleep(self.delay).await;
            Ok(InferenceResponse {
                text: self.reply.clone(),
                confidence: None,
            })
        }

        async fn probe(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct UnreachableBackend;

    #[async_trait]
    impl InferenceBackend for UnreachableBackend {
        async fn generate(&self, _prompt: &str) -> Result<InferenceResponse> {
            Err(Error::unavailable("connection refused"))
        }

        async fn probe(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn canned(reply: &str) -> Arc<dyn InferenceBackend> {
        Arc::new(CannedBackend {
            reply: reply.to_string(),
            delay: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn test_classified_outcome() {
        let classifier = SeverityClassifier::new(
            canned("extremely_harmful, self_harm, severity: 3"),
            ClassifierConfig::default(),
        );

        let outcome = classifier.classify("I want to kill myself").await;
        assert!(outcome.status.is_classified());
        assert_eq!(outcome.result.category, Category::SelfHarm);
        assert_eq!(outcome.result.severity, Severity::Extreme);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades() {
        let classifier =
            SeverityClassifier::new(Arc::new(UnreachableBackend), ClassifierConfig::default());

        let outcome = classifier.classify("hello").await;
        match outcome.status {
            Stage2Status::Degraded(reason) => assert!(reason.contains("connection refused")),
            other => panic!("expected degraded status, got {:?}", other),
        }
        // Fail-safe default: unreadable model means harmful
        assert_eq!(outcome.result.category, Category::Harmful);
        assert_eq!(outcome.result.severity, Severity::Extreme);
    }

    #[tokio::test]
    async fn test_fail_open_policy() {
        let config = ClassifierConfig {
            fallback_policy: FallbackPolicy::FailOpen,
            ..ClassifierConfig::default()
        };
        let classifier = SeverityClassifier::new(Arc::new(UnreachableBackend), config);

        let outcome = classifier.classify("hello").await;
        assert!(outcome.result.is_safe());
        assert!(matches!(outcome.status, Stage2Status::Degraded(_)));
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let classifier = SeverityClassifier::new(
            canned("I am just a language model"),
            ClassifierConfig::default(),
        );

        let outcome = classifier.classify("hello").await;
        assert!(matches!(outcome.status, Stage2Status::Fallback(_)));
        assert_eq!(outcome.result.category, Category::Harmful);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades() {
        let backend = Arc::new(CannedBackend {
            reply: "safe".to_string(),
            delay: Duration::from_secs(120),
        });
        let config = ClassifierConfig {
            request_timeout: Duration::from_secs(1),
            ..ClassifierConfig::default()
        };
        let classifier = SeverityClassifier::new(backend, config);

        let outcome = classifier.classify("hello").await;
        match outcome.status {
            Stage2Status::Degraded(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected degraded status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_saturation_degrades_instead_of_queueing() {
        let backend = Arc::new(CannedBackend {
            reply: "safe".to_string(),
            delay: Duration::from_millis(300),
        });
        let config = ClassifierConfig {
            max_concurrent: 1,
            queue_wait: Duration::from_millis(50),
            ..ClassifierConfig::default()
        };
        let classifier = Arc::new(SeverityClassifier::new(backend, config));

        let (first, second) = tokio::join!(classifier.classify("one"), classifier.classify("two"));

        let statuses = [first.status, second.status];
        assert!(statuses.iter().any(|s| s.is_classified()));
        assert!(statuses
            .iter()
            .any(|s| matches!(s, Stage2Status::Degraded(r) if r.contains("saturated"))));
    }

    #[test]
    fn test_status_rendering() {
        assert_eq!(Stage2Status::Classified.render(), "classified");
        assert_eq!(
            Stage2Status::Degraded("backend down".into()).render(),
            "degraded: backend down"
        );
        assert_eq!(
            Stage2Status::Fallback("bad output".into()).render(),
            "fallback: bad output"
        );
    }
}
