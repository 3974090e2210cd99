//! Ollama client

use super::{http_client, transport_error, GenerationBackend};
use crate::errors::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama `/api/generate` backend
pub struct OllamaBackend {
    name: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(name: String, base_url: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                backend: self.name.clone(),
                status,
                body,
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::Malformed {
                backend: self.name.clone(),
                message: e.to_string(),
            })?;

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse {
                backend: self.name.clone(),
            });
        }
        Ok(text)
    }
}
