//! Generation backend abstraction
//!
//! Provides a unified interface for the text generation providers:
//! - Ollama (`/api/generate`, non-streaming)
//! - OpenAI-compatible chat completions (OpenAI, OpenRouter)
//!
//! Backends are tried in configured order by [`AnswerChain`].

mod chain;
mod ollama;
mod openai;

pub use chain::{AnswerChain, ChainAnswer, EXHAUSTED_PREFIX};
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

#[cfg(test)]
pub(crate) use chain::testing;

use crate::config::{AppConfig, ProviderKind};
use crate::errors::{AppError, ProviderError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for text generation
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Name used in logs, metrics and audit messages
    fn name(&self) -> &str;

    /// Get the model name
    fn model(&self) -> &str;

    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map a transport error onto the backend taxonomy
pub(crate) fn transport_error(backend: &str, timeout: Duration, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            backend: backend.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        ProviderError::Network {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

/// Create the configured backends, in fallback order
pub fn create_backends(config: &AppConfig) -> Result<Vec<Arc<dyn GenerationBackend>>> {
    config
        .llm
        .backends
        .iter()
        .map(|backend| {
            let timeout = config.backend_timeout(backend);
            let created: Arc<dyn GenerationBackend> = match backend.provider {
                ProviderKind::Ollama => Arc::new(OllamaBackend::new(
                    backend.name.clone(),
                    backend.base_url.clone(),
                    backend.model.clone(),
                    timeout,
                )?),
                ProviderKind::Openai => {
                    let api_key = backend.resolve_api_key();
                    if api_key.is_none() {
                        tracing::warn!(
                            backend = %backend.name,
                            "No API key configured, backend will be skipped at call time"
                        );
                    }
                    Arc::new(OpenAiBackend::new(
                        backend.name.clone(),
                        backend.base_url.clone(),
                        backend.model.clone(),
                        api_key,
                        backend.temperature,
                        timeout,
                    )?)
                }
            };
            tracing::info!(
                backend = %backend.name,
                model = %backend.model,
                timeout_secs = timeout.as_secs(),
                "Generation backend configured"
            );
            Ok(created)
        })
        .collect()
}
