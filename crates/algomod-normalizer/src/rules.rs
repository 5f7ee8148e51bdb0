//! Rule tables for algospeak normalization
//!
//! Pattern tables are loaded once at startup and shared read-only across all
//! concurrent requests. A table that fails validation is a fatal startup
//! error: serving traffic with a partial rule set silently degrades
//! moderation quality without signaling it.

use algomod_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Shape of a rule's matched form. Both scopes match whole words only:
/// the matched span's outer edges must fall on word boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// A single word
    Token,
    /// A multi-word phrase
    Phrase,
}

/// One algospeak rewrite rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRule {
    /// The coded/obfuscated form
    pub matched: String,
    /// The canonical form it rewrites to
    pub canonical: String,
    pub scope: RuleScope,
}

impl PatternRule {
    fn new(matched: &str, canonical: &str) -> Self {
        let scope = if matched.contains(char::is_whitespace) {
            RuleScope::Phrase
        } else {
            RuleScope::Token
        };
        Self {
            matched: matched.to_string(),
            canonical: canonical.to_string(),
            scope,
        }
    }
}

/// A phrase that marks an overlapping trigger term as non-harmful usage,
/// vetoing any rewrite of that term within the matched span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeContextRule {
    /// The idiom/metaphor phrase, e.g. "killed it"
    pub pattern: String,
    /// The trigger term the phrase protects
    pub overridden_term: String,
}

/// Immutable rule tables for the normalizer
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub patterns: Vec<PatternRule>,
    pub safe_contexts: Vec<SafeContextRule>,
}

/// On-disk rule file shape. Sections mirror the algospeak dataset layout;
/// all four pattern sections map coded form -> canonical form, and
/// `safe_context_patterns` maps idiom phrase -> protected term.
#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default)]
    direct_mappings: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    homophones: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    misspellings: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    leetspeak: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    safe_context_patterns: serde_json::Map<String, serde_json::Value>,
}

impl RuleSet {
    /// Load rule tables from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read rule file {}: {}", path.display(), e)))?;
        let file: RuleFile = serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("invalid rule file {}: {}", path.display(), e)))?;

        let mut patterns = Vec::new();
        for section in [
            &file.direct_mappings,
            &file.homophones,
            &file.misspellings,
            &file.leetspeak,
        ] {
            for (matched, canonical) in section.iter() {
                let canonical = canonical
                    .as_str()
                    .ok_or_else(|| Error::config(format!("rule '{}' maps to a non-string value", matched)))?;
                patterns.push(PatternRule::new(matched, canonical));
            }
        }

        let mut safe_contexts = Vec::new();
        for (pattern, term) in file.safe_context_patterns.iter() {
            let term = term
                .as_str()
                .ok_or_else(|| Error::config(format!("safe context '{}' maps to a non-string value", pattern)))?;
            safe_contexts.push(SafeContextRule {
                pattern: pattern.to_string(),
                overridden_term: term.to_string(),
            });
        }

        let set = Self {
            patterns,
            safe_contexts,
        };
        set.validate()?;

        tracing::info!(
            patterns = set.patterns.len(),
            safe_contexts = set.safe_contexts.len(),
            "loaded rule tables from {}",
            path.display()
        );
        Ok(set)
    }

    /// Built-in default rule tables, used when no rule file is configured
    pub fn builtin() -> Self {
        let patterns = BUILTIN_PATTERNS
            .iter()
            .map(|(m, c)| PatternRule::new(m, c))
            .collect();
        let safe_contexts = BUILTIN_SAFE_CONTEXTS
            .iter()
            .map(|(p, t)| SafeContextRule {
                pattern: p.to_string(),
                overridden_term: t.to_string(),
            })
            .collect();

        let set = Self {
            patterns,
            safe_contexts,
        };
        debug_assert!(set.validate().is_ok());
        set
    }

    /// Reject empty or ambiguous rule tables.
    ///
    /// Duplicate `matched` values would make longest-match tie-breaking
    /// depend on table order in a way no one intended, so they are a
    /// configuration error rather than a silent last-wins.
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(Error::config("rule table contains no patterns"));
        }

        let mut seen = HashSet::new();
        for rule in &self.patterns {
            if rule.matched.trim().is_empty() || rule.canonical.trim().is_empty() {
                return Err(Error::config("pattern rules must have non-empty match and canonical forms"));
            }
            if !seen.insert(rule.matched.to_lowercase()) {
                return Err(Error::config(format!(
                    "duplicate pattern rule for '{}'",
                    rule.matched
                )));
            }
        }

        for rule in &self.safe_contexts {
            if rule.pattern.trim().is_empty() {
                return Err(Error::config("safe context patterns must be non-empty"));
            }
        }

        Ok(())
    }
}

/// Default algospeak table: coded form -> canonical form. Covers the common
/// direct mappings, homophones, misspellings, and leetspeak forms.
const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    // Direct mappings
    ("unalive", "kill"),
    ("unalived", "killed"),
    ("unaliving", "killing"),
    ("self delete", "suicide"),
    ("sewer slide", "suicide"),
    ("seggs", "sex"),
    ("corn", "porn"),
    ("le dollar bean", "lesbian"),
    ("le$bean", "lesbian"),
    ("grape", "rape"),
    ("graped", "raped"),
    ("kys", "kill yourself"),
    ("kms", "kill myself"),
    // Misspellings
    ("sooicide", "suicide"),
    ("suwicide", "suicide"),
    ("phuck", "fuck"),
    ("fck", "fuck"),
    ("fcking", "fucking"),
    ("btch", "bitch"),
    // Leetspeak
    ("k1ll", "kill"),
    ("k!ll", "kill"),
    ("s3x", "sex"),
    ("pr0n", "porn"),
    ("p0rn", "porn"),
    ("d1e", "die"),
    ("h8", "hate"),
    ("n4zi", "nazi"),
];

/// Default safe-context idioms: phrase -> the trigger term it protects
const BUILTIN_SAFE_CONTEXTS: &[(&str, &str)] = &[
    ("killed it", "killed"),
    ("killing it", "killing"),
    ("dressed to kill", "kill"),
    ("dead tired", "dead"),
    ("drop dead gorgeous", "dead"),
    ("corn on the cob", "corn"),
    ("candy corn", "corn"),
    ("sweet corn", "corn"),
    ("corn bread", "corn"),
    ("corn field", "corn"),
    ("grape juice", "grape"),
    ("grape soda", "grape"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_validates() {
        assert!(RuleSet::builtin().validate().is_ok());
    }

    #[test]
    fn test_scope_inference() {
        assert_eq!(PatternRule::new("seggs", "sex").scope, RuleScope::Token);
        assert_eq!(PatternRule::new("sewer slide", "suicide").scope, RuleScope::Phrase);
    }

    #[test]
    fn test_duplicate_rules_rejected() {
        let set = RuleSet {
            patterns: vec![
                PatternRule::new("seggs", "sex"),
                PatternRule::new("SEGGS", "sex"),
            ],
            safe_contexts: Vec::new(),
        };
        assert!(matches!(set.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_table_rejected() {
        let set = RuleSet {
            patterns: Vec::new(),
            safe_contexts: Vec::new(),
        };
        assert!(matches!(set.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "direct_mappings": {{"unalive": "kill", "sewer slide": "suicide"}},
                "leetspeak": {{"s3x": "sex"}},
                "safe_context_patterns": {{"killed it": "killed"}}
            }}"#
        )
        .unwrap();

        let set = RuleSet::from_file(file.path()).unwrap();
        assert_eq!(set.patterns.len(), 3);
        assert_eq!(set.safe_contexts.len(), 1);
        assert_eq!(set.patterns[0].matched, "unalive");
        assert_eq!(set.patterns[1].scope, RuleScope::Phrase);
    }

    #[test]
    fn test_load_rejects_non_string_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"direct_mappings": {{"unalive": 3}}}}"#).unwrap();
        assert!(matches!(
            RuleSet::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }
}
