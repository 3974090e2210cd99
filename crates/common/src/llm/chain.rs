//! Ordered fallback across generation backends

use super::{create_backends, GenerationBackend};
use crate::audit::AuditSink;
use crate::config::AppConfig;
use crate::errors::{ProviderError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Prefix of the text returned when every backend failed
pub const EXHAUSTED_PREFIX: &str = "LLM error:";

/// Result of one chain invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAnswer {
    pub text: String,
    /// Backend that answered; `None` when the chain was exhausted
    pub backend: Option<String>,
}

impl ChainAnswer {
    pub fn is_exhausted(&self) -> bool {
        self.backend.is_none()
    }
}

struct Link {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

/// Tries each backend once, in order, under its timeout. Never fails.
pub struct AnswerChain {
    links: Vec<Link>,
    audit: Arc<dyn AuditSink>,
}

impl AnswerChain {
    pub fn new(
        backends: Vec<(Arc<dyn GenerationBackend>, Duration)>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let links = backends
            .into_iter()
            .map(|(backend, timeout)| Link { backend, timeout })
            .collect();
        Self { links, audit }
    }

    /// Backends from configuration, each with its effective timeout
    pub fn from_config(config: &AppConfig, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let backends = create_backends(config)?;
        let timeouts = config.llm.backends.iter().map(|b| config.backend_timeout(b));
        Ok(Self::new(backends.into_iter().zip(timeouts).collect(), audit))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.backend.name()).collect()
    }

    /// Answer text only
    pub async fn answer(&self, prompt: &str) -> String {
        self.generate(prompt).await.text
    }

    pub async fn generate(&self, prompt: &str) -> ChainAnswer {
        let mut last_error: Option<ProviderError> = None;

        for link in &self.links {
            let name = link.backend.name();
            let started = Instant::now();

            let outcome = match tokio::time::timeout(link.timeout, link.backend.generate(prompt)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
                Ok(Ok(_)) => Err(ProviderError::EmptyResponse {
                    backend: name.to_string(),
                }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ProviderError::Timeout {
                    backend: name.to_string(),
                    timeout_ms: link.timeout.as_millis() as u64,
                }),
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(text) => {
                    metrics::record_backend(name, "success", elapsed.as_secs_f64());
                    info!(
                        backend = %name,
                        model = %link.backend.model(),
                        latency_ms = elapsed.as_millis() as u64,
                        "Backend answered"
                    );
                    self.spawn_audit(prompt, &text);
                    return ChainAnswer {
                        text,
                        backend: Some(name.to_string()),
                    };
                }
                Err(e) => {
                    metrics::record_backend(name, e.kind(), elapsed.as_secs_f64());
                    warn!(
                        backend = %name,
                        error = %e,
                        kind = e.kind(),
                        "Backend failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        metrics::record_chain_exhausted();
        let text = match last_error {
            Some(e) => format!("{} {}", EXHAUSTED_PREFIX, e),
            None => format!("{} no generation backends configured", EXHAUSTED_PREFIX),
        };
        warn!(error = %text, "All generation backends failed");
        self.spawn_audit(prompt, &text);

        ChainAnswer {
            text,
            backend: None,
        }
    }

    /// Detached delivery; failures are logged and counted
    fn spawn_audit(&self, prompt: &str, response: &str) {
        let sink = Arc::clone(&self.audit);
        let prompt = prompt.to_string();
        let response = response.to_string();

        tokio::spawn(async move {
            match sink.record(&prompt, &response).await {
                Ok(()) => debug!(sink = sink.name(), "Audit delivered"),
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "Audit delivery failed");
                    metrics::record_audit_failure(sink.name());
                }
            }
        });
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_primary_answers() {
        let primary = ScriptedBackend::replying("ollama", "Ramesh Patel");
        let secondary = ScriptedBackend::replying("openrouter", "unused");
        let chain = chain_of(&[primary.clone(), secondary.clone()], Arc::default());

        let answer = chain.generate("who owns it").await;
        assert_eq!(answer.text, "Ramesh Patel");
        assert_eq!(answer.backend.as_deref(), Some("ollama"));
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_falls_through_to_secondary_once() {
        let primary = ScriptedBackend::new("ollama", vec![Script::Hang]);
        let secondary = ScriptedBackend::replying("openrouter", "Rs. 4,500/sqft");
        let chain = chain_of(&[primary.clone(), secondary.clone()], Arc::default());

        let answer = chain.generate("jantry rate").await;
        assert_eq!(answer.text, "Rs. 4,500/sqft");
        assert_eq!(answer.backend.as_deref(), Some("openrouter"));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_counts_as_failure() {
        let primary = ScriptedBackend::replying("ollama", "   ");
        let secondary = ScriptedBackend::replying("openrouter", "value");
        let chain = chain_of(&[primary, secondary], Arc::default());
        assert_eq!(chain.answer("q").await, "value");
    }

    #[tokio::test]
    async fn test_all_failing_is_exhausted_not_an_error() {
        let primary = ScriptedBackend::new("ollama", vec![Script::Hang]);
        let secondary = ScriptedBackend::new("openrouter", vec![Script::Fail]);
        let chain = chain_of(&[primary, secondary.clone()], Arc::default());

        let answer = chain.generate("q").await;
        assert!(answer.is_exhausted());
        assert!(answer.text.starts_with(EXHAUSTED_PREFIX));
        assert!(answer.text.contains("openrouter"));
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain = AnswerChain::new(Vec::new(), Arc::new(CountingSink::default()));
        assert!(chain.generate("q").await.is_exhausted());
    }

    #[tokio::test]
    async fn test_failing_audit_does_not_affect_answer() {
        let sink = Arc::new(CountingSink {
            fail: true,
            ..Default::default()
        });
        let chain = chain_of(&[ScriptedBackend::replying("ollama", "answer")], sink.clone());

        let answer = chain.generate("q").await;
        assert_eq!(answer.text, "answer");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }
}
