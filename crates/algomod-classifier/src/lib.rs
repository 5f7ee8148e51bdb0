//! algomod Classifier
//!
//! Stage 2 of the moderation pipeline: sends normalized text to a fine-tuned
//! language model behind an HTTP inference endpoint and maps the output to a
//! category and severity, containing every failure mode locally.

pub mod backend;
pub mod classifier;
pub mod parser;

pub use backend::{InferenceBackend, InferenceResponse, OllamaBackend};
pub use classifier::{
    ClassifiedOutcome, ClassifierConfig, FallbackPolicy, SeverityClassifier, Stage2Status,
};
pub use parser::{parse_output, DEFAULT_CONFIDENCE};
