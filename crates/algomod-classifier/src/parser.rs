//! Tolerant parsing of model output into category + severity
//!
//! The fine-tuned model answers in a loose "label, severity: N" shape
//! ("extremely_harmful, self_harm, severity: 3"), but drifts: bare labels,
//! prose, reordered fields. The parser accepts anything it can read a known
//! category out of and reports everything else as a parse error for the
//! fallback policy to handle.

use algomod_core::{Category, ClassificationResult, Error, Result, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Confidence reported when the backend offers no score, so downstream
/// consumers always have a numeric value to threshold on.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

fn severity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"severity[:\s=]*([0-3])").unwrap())
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"confidence[:\s=]*([01]?\.\d+|[01])").unwrap())
}

/// Parse raw model output into a classification.
///
/// Returns `Error::Parse` when no known category can be read; the caller
/// decides between fail-safe and fail-open.
pub fn parse_output(raw: &str) -> Result<ClassificationResult> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::parse("empty model output"));
    }

    let lower = trimmed.to_lowercase().replace("not safe", "unsafe");

    let severity = severity_re()
        .captures(&lower)
        .and_then(|c| c[1].parse::<u8>().ok())
        .and_then(Severity::from_u8);

    let confidence = confidence_re()
        .captures(&lower)
        .and_then(|c| c[1].parse::<f32>().ok())
        .unwrap_or(DEFAULT_CONFIDENCE);

    match find_category(&lower) {
        Some(Category::Safe) => Ok(ClassificationResult::safe(confidence)),
        Some(category) => {
            let severity = severity.unwrap_or(if lower.contains("extremely") {
                Severity::Extreme
            } else {
                Severity::High
            });
            Ok(ClassificationResult::new(category, severity, confidence))
        }
        None => Err(Error::parse(format!(
            "no known category in model output: {:.80}",
            trimmed
        ))),
    }
}

/// Find the most specific category mentioned. Specific harm types win over
/// the generic "harmful"/"safe" markers, which only apply when nothing
/// more precise appears.
fn find_category(lower: &str) -> Option<Category> {
    let mut generic: Option<Category> = None;

    // Segment pass handles multi-word labels like "hate speech".
    for segment in lower.split([',', '.', ';', ':', '\n']) {
        let candidate = segment
            .trim()
            .trim_start_matches("extremely_")
            .trim_start_matches("extremely")
            .trim();
        match Category::from_label(candidate) {
            Some(cat @ (Category::Safe | Category::Harmful)) => {
                generic.get_or_insert(cat);
            }
            Some(specific) => return Some(specific),
            None => {}
        }
    }

    // Word pass catches labels embedded in prose.
    for word in lower.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-')) {
        if word.is_empty() || word == "extremely" {
            continue;
        }
        match Category::from_label(word.trim_start_matches("extremely_")) {
            Some(cat @ (Category::Safe | Category::Harmful)) => {
                generic.get_or_insert(cat);
            }
            Some(specific) => return Some(specific),
            None => {}
        }
    }

    generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_answer_shape() {
        let result = parse_output("extremely_harmful, self_harm, severity: 3").unwrap();
        assert_eq!(result.category, Category::SelfHarm);
        assert_eq!(result.severity, Severity::Extreme);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_bare_safe() {
        let result = parse_output("safe").unwrap();
        assert_eq!(result.category, Category::Safe);
        assert_eq!(result.severity, Severity::None);
    }

    #[test]
    fn test_bare_harmful() {
        let result = parse_output("harmful").unwrap();
        assert_eq!(result.category, Category::Harmful);
        assert_eq!(result.severity, Severity::High);
    }

    #[test]
    fn test_labelled_category_with_severity() {
        let result = parse_output("harmful: harassment, severity: 1").unwrap();
        assert_eq!(result.category, Category::Harassment);
        assert_eq!(result.severity, Severity::Mild);
    }

    #[test]
    fn test_multiword_label_in_prose() {
        let result = parse_output("This text contains hate speech.").unwrap();
        assert_eq!(result.category, Category::HateSpeech);
        assert_eq!(result.severity, Severity::High);
    }

    #[test]
    fn test_extremely_without_numeric_severity() {
        let result = parse_output("extremely harmful, violence").unwrap();
        assert_eq!(result.category, Category::Violence);
        assert_eq!(result.severity, Severity::Extreme);
    }

    #[test]
    fn test_not_safe_is_not_safe() {
        let result = parse_output("not safe").unwrap();
        assert_eq!(result.category, Category::Harmful);
    }

    #[test]
    fn test_severity_zero_with_harm_category_is_bumped() {
        let result = parse_output("profanity, severity: 0").unwrap();
        assert_eq!(result.category, Category::Profanity);
        assert_eq!(result.severity, Severity::Mild);
    }

    #[test]
    fn test_confidence_extraction() {
        let result = parse_output("safe, confidence: 0.92").unwrap();
        assert!((result.confidence - 0.92).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unparseable_output() {
        assert!(parse_output("").is_err());
        assert!(parse_output("   ").is_err());
        assert!(parse_output("I am a large language model").is_err());
    }
}
