//! algomod Server
//!
//! Orchestrates the two-stage moderation pipeline (algospeak normalization,
//! then severity-aware classification) and exposes it over HTTP for the
//! demo UI and other consumers.

pub mod config;
pub mod pipeline;
pub mod routes;

pub use config::{Cli, ServerConfig};
pub use pipeline::{ModerationPipeline, StageComparison, StageVerdict};
pub use routes::{create_router, AppState};
