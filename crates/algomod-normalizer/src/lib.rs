//! algomod Normalizer
//!
//! Stage 1 of the moderation pipeline: rewrites algospeak (coded vocabulary
//! used to evade automated filters) into canonical terms, while suppressing
//! rewrites inside recognized safe-usage contexts.

pub mod normalizer;
pub mod rules;

pub use normalizer::Normalizer;
pub use rules::{PatternRule, RuleScope, RuleSet, SafeContextRule};
