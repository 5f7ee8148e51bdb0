//! Server configuration

use algomod_classifier::FallbackPolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "algomod-server")]
#[command(about = "Two-stage algospeak moderation server", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Inference backend base URL
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Model name served by the backend
    #[arg(short, long)]
    pub model: Option<String>,

    /// Algospeak rule file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Server configuration, loaded from YAML with CLI overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// Inference backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Fine-tuned model name
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Completion length cap; classification answers are short
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,
}

/// Moderation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Over-length input is rejected, never truncated
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Rule file path; built-in defaults when absent
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// What to return when the model's answer cannot be trusted
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,

    /// Maximum in-flight inference calls (1 for a single-instance model)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_inference: usize,

    /// How long to wait for an inference slot before degrading
    #[serde(default = "default_queue_wait")]
    pub queue_wait_secs: u64,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(backend) = &cli.backend {
            config.backend.base_url = backend.clone();
        }
        if let Some(model) = &cli.model {
            config.backend.model = model.clone();
        }
        if let Some(rules) = &cli.rules {
            config.moderation.rules_path = Some(rules.clone());
        }
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            backend: BackendConfig::default(),
            moderation: ModerationConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
            num_predict: default_num_predict(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            rules_path: None,
            fallback_policy: FallbackPolicy::default(),
            max_concurrent_inference: default_max_concurrent(),
            queue_wait_secs: default_queue_wait(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_backend_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen-algospeak:latest".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_num_predict() -> u32 {
    30
}

fn default_max_input_bytes() -> usize {
    8 * 1024
}

fn default_max_concurrent() -> usize {
    1
}

fn default_queue_wait() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.backend.model, "qwen-algospeak:latest");
        assert_eq!(config.moderation.max_concurrent_inference, 1);
        assert_eq!(config.moderation.fallback_policy, FallbackPolicy::FailSafe);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: ServerConfig =
            serde_yaml::from_str("backend:\n  model: custom-model\n").unwrap();
        assert_eq!(config.backend.model, "custom-model");
        assert_eq!(config.backend.base_url, "http://localhost:11434");
        assert_eq!(config.moderation.max_input_bytes, 8 * 1024);
    }

    #[test]
    fn test_fallback_policy_from_yaml() {
        let config: ServerConfig =
            serde_yaml::from_str("moderation:\n  fallback_policy: fail_open\n").unwrap();
        assert_eq!(config.moderation.fallback_policy, FallbackPolicy::FailOpen);
    }
}
