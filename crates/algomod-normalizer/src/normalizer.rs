//! Algospeak normalizer (Stage 1)
//!
//! Rewrites coded/obfuscated language into canonical terms using a
//! leftmost-longest Aho-Corasick scan, with safe-context suppression applied
//! first. Pure, stateless, and deterministic: the same input always produces
//! the same output, and the automatons are built once and shared read-only
//! across all concurrent requests.

use crate::rules::{PatternRule, RuleSet, SafeContextRule};
use aho_corasick::{AhoCorasick, MatchKind};
use algomod_core::{AppliedRule, Error, NormalizationResult, Result};

pub struct Normalizer {
    patterns: AhoCorasick,
    rules: Vec<PatternRule>,
    safe_patterns: AhoCorasick,
    safe_rules: Vec<SafeContextRule>,
}

impl Normalizer {
    /// Build a normalizer from a validated rule set.
    ///
    /// `LeftmostLongest` gives the required precedence directly: the longest
    /// literal match wins over shorter overlapping ones, ties break by rule
    /// declaration order.
    pub fn new(rule_set: &RuleSet) -> Result<Self> {
        rule_set.validate()?;

        let patterns = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(rule_set.patterns.iter().map(|r| r.matched.as_str()))
            .map_err(|e| Error::config(format!("failed to build pattern matcher: {}", e)))?;

        let safe_patterns = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(rule_set.safe_contexts.iter().map(|r| r.pattern.as_str()))
            .map_err(|e| Error::config(format!("failed to build safe-context matcher: {}", e)))?;

        Ok(Self {
            patterns,
            rules: rule_set.patterns.clone(),
            safe_patterns,
            safe_rules: rule_set.safe_contexts.clone(),
        })
    }

    /// Normalize algospeak in `text`. Never fails: input that matches
    /// nothing (or is empty/non-alphabetic) comes back unchanged with
    /// `algospeak_detected == false`.
    pub fn normalize(&self, text: &str) -> NormalizationResult {
        if text.trim().is_empty() || !text.chars().any(|c| c.is_alphabetic()) {
            return NormalizationResult::unchanged(text);
        }

        // Safe-context suppression runs before rewriting, not as a
        // post-filter: rewriting is destructive, and once a trigger term is
        // replaced the surrounding words that identify the idiom no longer
        // align. Protected spans veto any overlapping pattern match,
        // regardless of match length.
        let protected = self.protected_spans(text);

        let mut output = String::with_capacity(text.len());
        let mut applied = Vec::new();
        let mut last_end = 0;

        for m in self.patterns.find_iter(text) {
            let rule = &self.rules[m.pattern().as_usize()];

            // Every rule matches whole words only, phrases included: the
            // span's outer edges must fall on word boundaries, so "sewer
            // slide" does not fire inside "sewer slides".
            if !word_bounded(text, m.start(), m.end()) {
                continue;
            }
            if protected.iter().any(|&(s, e)| spans_overlap(s, e, m.start(), m.end())) {
                tracing::debug!(term = %rule.matched, "rewrite suppressed by safe context");
                continue;
            }

            output.push_str(&text[last_end..m.start()]);
            output.push_str(&rule.canonical);
            last_end = m.end();

            applied.push(AppliedRule {
                matched: rule.matched.clone(),
                canonical: rule.canonical.clone(),
            });
        }
        output.push_str(&text[last_end..]);

        let algospeak_detected = !applied.is_empty();
        if algospeak_detected {
            tracing::debug!(rules = applied.len(), "algospeak normalized");
        }

        NormalizationResult {
            original_text: text.to_string(),
            normalized_text: output,
            algospeak_detected,
            matched_rules: applied,
        }
    }

    /// Byte spans covered by safe-context idioms
    fn protected_spans(&self, text: &str) -> Vec<(usize, usize)> {
        self.safe_patterns
            .find_iter(text)
            .filter(|m| {
                // Idioms are whole-word phrases; "skilled it" must not
                // protect anything.
                word_bounded(text, m.start(), m.end())
            })
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.rules.len()
    }

    pub fn safe_context_count(&self) -> usize {
        self.safe_rules.len()
    }
}

fn spans_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start < b_end && b_start < a_end
}

/// True if the span at [start, end) is not embedded in a larger word.
/// Patterns are ASCII, so the span edges always fall on char boundaries.
fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_alphanumeric());
    before_ok && after_ok
}
