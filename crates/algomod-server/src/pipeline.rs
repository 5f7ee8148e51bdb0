//! Moderation orchestrator
//!
//! Sequences Normalizer -> Classifier per request and assembles the combined
//! result. Per request the flow is START -> NORMALIZE -> CLASSIFY -> DONE;
//! input that fails validation short-circuits before NORMALIZE with a
//! structured error, never partial results. No state is held across
//! requests: the rule tables and the backend handle are initialized once at
//! startup and shared read-only.

use algomod_classifier::SeverityClassifier;
use algomod_core::{Error, ModerationResult, NormalizationResult, Result};
use algomod_normalizer::Normalizer;
use serde::Serialize;
use std::sync::Arc;

pub struct ModerationPipeline {
    normalizer: Arc<Normalizer>,
    classifier: Arc<SeverityClassifier>,
    max_input_bytes: usize,
}

/// One stage's standalone verdict, for the comparison endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StageVerdict {
    pub classification: String,
    pub status: String,
    pub confidence: f32,
}

/// Side-by-side view of each stage running alone versus the full pipeline,
/// demonstrating the standalone failure modes of each
#[derive(Debug, Clone, Serialize)]
pub struct StageComparison {
    /// Stage 1 alone: normalization of the raw input
    pub normalizer_only: NormalizationResult,

    /// Stage 2 alone: classification of the raw (un-normalized) input
    pub classifier_only: StageVerdict,

    /// The full two-stage pipeline
    pub pipeline: ModerationResult,
}

impl ModerationPipeline {
    pub fn new(
        normalizer: Arc<Normalizer>,
        classifier: Arc<SeverityClassifier>,
        max_input_bytes: usize,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            max_input_bytes,
        }
    }

    /// Run the full pipeline on one input.
    ///
    /// Fails only on validation; Stage 2 failures are contained by the
    /// classifier and surface through `stage2_status` while the Stage 1
    /// output is still returned.
    pub async fn moderate(&self, text: &str) -> Result<ModerationResult> {
        self.validate(text)?;

        let normalization = self.normalizer.normalize(text);
        let stage1_status = stage1_status(&normalization);
        if normalization.algospeak_detected {
            metrics::counter!("algomod_algospeak_detected_total").increment(1);
        }

        let outcome = self.classifier.classify(&normalization.normalized_text).await;
        metrics::counter!(
            "algomod_stage2_outcomes_total",
            "outcome" => if outcome.status.is_classified() { "classified" } else { "contained" }
        )
        .increment(1);

        Ok(ModerationResult {
            original_text: normalization.original_text,
            normalized_text: normalization.normalized_text,
            algospeak_detected: normalization.algospeak_detected,
            classification: outcome.result.render(),
            stage1_status,
            stage2_status: outcome.status.render(),
        })
    }

    /// Run each stage alone plus the full pipeline, side by side
    pub async fn compare(&self, text: &str) -> Result<StageComparison> {
        self.validate(text)?;

        let normalizer_only = self.normalizer.normalize(text);

        // Deliberately classify the raw text: this is the "no Stage 1" view.
        let raw_outcome = self.classifier.classify(text).await;
        let classifier_only = StageVerdict {
            classification: raw_outcome.result.render(),
            status: raw_outcome.status.render(),
            confidence: raw_outcome.result.confidence,
        };

        let pipeline = self.moderate(text).await?;

        Ok(StageComparison {
            normalizer_only,
            classifier_only,
            pipeline,
        })
    }

    pub async fn backend_reachable(&self) -> bool {
        self.classifier.backend_reachable().await
    }

    pub fn backend_name(&self) -> &str {
        self.classifier.backend_name()
    }

    fn validate(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::validation("text must not be empty"));
        }
        if text.len() > self.max_input_bytes {
            return Err(Error::validation(format!(
                "input of {} bytes exceeds the maximum of {} bytes",
                text.len(),
                self.max_input_bytes
            )));
        }
        Ok(())
    }
}

fn stage1_status(normalization: &NormalizationResult) -> String {
    if normalization.algospeak_detected {
        format!(
            "pattern match: {} rules applied",
            normalization.matched_rules.len()
        )
    } else {
        "no algospeak detected".to_string()
    }
}
