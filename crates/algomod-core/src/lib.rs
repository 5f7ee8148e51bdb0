//! algomod Core
//!
//! Core types and error handling shared across the moderation pipeline.
//!
//! This crate provides:
//! - The category/severity model for classified content
//! - Per-request result types for both stages and the combined response
//! - The error taxonomy used across all components

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AppliedRule, Category, ClassificationResult, ModerationResult, NormalizationResult, Severity,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        AppliedRule, Category, ClassificationResult, ModerationResult, NormalizationResult,
        Severity,
    };
}
