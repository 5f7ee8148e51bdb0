//! Shared types for the two-stage moderation pipeline

use serde::{Deserialize, Serialize};

/// Harm categories that classified content can fall into.
///
/// Category and severity are independent axes: the category names the type
/// of harm, the severity ranks its intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// No harmful content detected
    Safe,
    /// Harmful, but the model did not name a specific harm type
    Harmful,
    Profanity,
    Harassment,
    HateSpeech,
    SelfHarm,
    Violence,
    SexualContent,
    Spam,
}

impl Category {
    /// Snake-case label as used in model output and the API boundary
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Harmful => "harmful",
            Self::Profanity => "profanity",
            Self::Harassment => "harassment",
            Self::HateSpeech => "hate_speech",
            Self::SelfHarm => "self_harm",
            Self::Violence => "violence",
            Self::SexualContent => "sexual_content",
            Self::Spam => "spam",
        }
    }

    /// Tolerant label lookup for free-form model output.
    ///
    /// Fine-tuned models are not perfectly consistent about label spelling,
    /// so this accepts the common variants seen in practice.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.as_str() {
            "safe" | "clean" | "benign" => Some(Self::Safe),
            "harmful" | "unsafe" => Some(Self::Harmful),
            "profanity" | "profane" | "obscenity" => Some(Self::Profanity),
            "harassment" | "harassing" | "bullying" => Some(Self::Harassment),
            "hate_speech" | "hate" | "hateful" | "discrimination" => Some(Self::HateSpeech),
            "self_harm" | "suicide" | "suicidal" => Some(Self::SelfHarm),
            "violence" | "violent" | "threat" | "threats" => Some(Self::Violence),
            "sexual_content" | "sexual" | "sexually_explicit" | "nsfw" => {
                Some(Self::SexualContent)
            }
            "spam" | "scam" => Some(Self::Spam),
            _ => None,
        }
    }
}

/// Ordinal harm severity, 0 (safe) through 3 (extremely harmful)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    None,
    Mild,
    High,
    Extreme,
}

impl Severity {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Mild => 1,
            Self::High => 2,
            Self::Extreme => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Mild),
            2 => Some(Self::High),
            3 => Some(Self::Extreme),
            _ => None,
        }
    }
}

/// Result of Stage 2 classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Type of harm detected
    pub category: Category,

    /// How harmful the content is, independent of category
    pub severity: Severity,

    /// Model confidence in [0, 1]
    pub confidence: f32,
}

impl ClassificationResult {
    /// Create a classification result, enforcing the severity invariant:
    /// `Safe` always pairs with severity 0, and no other category may
    /// report severity 0.
    pub fn new(category: Category, severity: Severity, confidence: f32) -> Self {
        let severity = match (category, severity) {
            (Category::Safe, _) => Severity::None,
            (_, Severity::None) => Severity::Mild,
            (_, s) => s,
        };

        Self {
            category,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// A safe verdict with the given confidence
    pub fn safe(confidence: f32) -> Self {
        Self::new(Category::Safe, Severity::None, confidence)
    }

    /// Human-readable rendering for the API boundary.
    ///
    /// Every non-safe verdict contains the substring "harmful" so simple
    /// substring checks on the consumer side keep working.
    pub fn render(&self) -> String {
        match (self.category, self.severity) {
            (Category::Safe, _) => "safe".to_string(),
            (Category::Harmful, Severity::Extreme) => "extremely harmful (severity 3)".to_string(),
            (Category::Harmful, s) => format!("harmful (severity {})", s.as_u8()),
            (c, Severity::Extreme) => {
                format!("extremely harmful: {} (severity 3)", c.as_str())
            }
            (c, s) => format!("harmful: {} (severity {})", c.as_str(), s.as_u8()),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.category == Category::Safe
    }
}

/// One algospeak rewrite applied by the normalizer, recorded for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRule {
    /// The algospeak form that matched
    pub matched: String,

    /// The canonical form it was rewritten to
    pub canonical: String,
}

/// Result of Stage 1 normalization. Created fresh per request and never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationResult {
    pub original_text: String,
    pub normalized_text: String,

    /// True iff at least one pattern rule was applied
    pub algospeak_detected: bool,

    /// Rules applied, in left-to-right application order
    pub matched_rules: Vec<AppliedRule>,
}

impl NormalizationResult {
    /// A no-op result for input that required no rewriting
    pub fn unchanged(text: &str) -> Self {
        Self {
            original_text: text.to_string(),
            normalized_text: text.to_string(),
            algospeak_detected: false,
            matched_rules: Vec::new(),
        }
    }
}

/// The single entity exposed across the system boundary: both stages'
/// outputs plus a short status string per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub original_text: String,
    pub normalized_text: String,
    pub algospeak_detected: bool,

    /// Human-readable category + severity rendering
    pub classification: String,

    /// Stage 1 outcome, e.g. "pattern match: 2 rules applied"
    pub stage1_status: String,

    /// Stage 2 outcome, e.g. "classified" or "degraded: <reason>"
    pub stage2_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_always_severity_zero() {
        let result = ClassificationResult::new(Category::Safe, Severity::Extreme, 0.9);
        assert_eq!(result.severity, Severity::None);
    }

    #[test]
    fn test_non_safe_never_severity_zero() {
        let result = ClassificationResult::new(Category::Profanity, Severity::None, 0.9);
        assert_eq!(result.severity, Severity::Mild);
    }

    #[test]
    fn test_confidence_clamped() {
        let result = ClassificationResult::new(Category::Safe, Severity::None, 1.7);
        assert_eq!(result.confidence, 1.0);
        let result = ClassificationResult::new(Category::Safe, Severity::None, -0.3);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_render_contains_harmful_for_non_safe() {
        for category in [
            Category::Harmful,
            Category::Profanity,
            Category::Harassment,
            Category::HateSpeech,
            Category::SelfHarm,
            Category::Violence,
            Category::SexualContent,
            Category::Spam,
        ] {
            for severity in [Severity::Mild, Severity::High, Severity::Extreme] {
                let rendered = ClassificationResult::new(category, severity, 0.5).render();
                assert!(
                    rendered.contains("harmful"),
                    "rendering {:?}/{:?} lost the harmful marker: {}",
                    category,
                    severity,
                    rendered
                );
            }
        }
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(ClassificationResult::safe(0.9).render(), "safe");
        assert_eq!(
            ClassificationResult::new(Category::Profanity, Severity::High, 0.8).render(),
            "harmful: profanity (severity 2)"
        );
        assert_eq!(
            ClassificationResult::new(Category::SelfHarm, Severity::Extreme, 0.8).render(),
            "extremely harmful: self_harm (severity 3)"
        );
    }

    #[test]
    fn test_category_label_variants() {
        assert_eq!(Category::from_label("Hate Speech"), Some(Category::HateSpeech));
        assert_eq!(Category::from_label("self-harm"), Some(Category::SelfHarm));
        assert_eq!(Category::from_label("SAFE"), Some(Category::Safe));
        assert_eq!(Category::from_label("gibberish"), None);
    }

    #[test]
    fn test_moderation_result_wire_shape() {
        let result = ModerationResult {
            original_text: "corn star".into(),
            normalized_text: "porn star".into(),
            algospeak_detected: true,
            classification: "harmful: sexual_content (severity 2)".into(),
            stage1_status: "pattern match: 1 rules applied".into(),
            stage2_status: "classified".into(),
        };

        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "original_text",
            "normalized_text",
            "algospeak_detected",
            "classification",
            "stage1_status",
            "stage2_status",
        ] {
            assert!(json.get(key).is_some(), "missing field {}", key);
        }
    }
}
