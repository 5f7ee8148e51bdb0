//! Inference backend trait and the Ollama HTTP adapter

use algomod_core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw output of one inference call
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    /// The model's completion text
    pub text: String,

    /// Confidence score, when the backend provides one
    pub confidence: Option<f32>,
}

/// Abstraction over the language-model inference endpoint.
///
/// The pipeline only ever holds this trait object, so tests swap in mock
/// backends and the serving deployment can change without touching the
/// classifier.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run one completion for the given prompt
    async fn generate(&self, prompt: &str) -> Result<InferenceResponse>;

    /// Cheap reachability probe, used by the health endpoint. Must never
    /// block liveness: failure means "degraded", not "down".
    async fn probe(&self) -> bool;

    /// Backend name for status strings and logs
    fn name(&self) -> &str;
}

/// Ollama `/api/generate` adapter for the fine-tuned moderation model
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    /// Low temperature for consistent classification output
    temperature: f32,
    /// Cap on completion length; classification answers are short
    num_predict: u32,
    stop: &'a [&'a str],
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration, num_predict: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            num_predict,
        })
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<InferenceResponse> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: self.num_predict,
                stop: &["\n\n", "Text:", "Classification:"],
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::InferenceTimeout
                } else {
                    Error::unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::unavailable(format!(
                "ollama returned status {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("malformed ollama response: {}", e)))?;

        Ok(InferenceResponse {
            text: body.response,
            // Ollama's generate API does not report per-answer confidence
            confidence: None,
        })
    }

    async fn probe(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}
