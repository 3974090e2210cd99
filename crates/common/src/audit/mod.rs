//! Audit sinks for prompt/response pairs
//!
//! Delivery is best effort. The answer chain spawns every call and only logs
//! failures.

use crate::config::AuditConfig;
use crate::errors::{AppError, AuditError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Telegram rejects messages above 4096 characters
const TELEGRAM_MAX_CHARS: usize = 4096;

/// Receives every prompt/response pair produced by the answer chain
#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &str;

    async fn record(&self, prompt: &str, response: &str) -> std::result::Result<(), AuditError>;
}

/// Writes pairs to the structured log
#[derive(Debug, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record(&self, prompt: &str, response: &str) -> std::result::Result<(), AuditError> {
        tracing::debug!(
            prompt_chars = prompt.chars().count(),
            response = %response,
            "LLM exchange"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

/// Forwards pairs to a Telegram chat through the Bot API
pub struct TelegramAuditSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramAuditSink {
    pub fn new(api_base: &str, bot_token: &str, chat_id: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
            chat_id,
        })
    }

    /// Markdown summary, prompt shortened so the message fits
    pub fn format_message(prompt: &str, response: &str) -> String {
        let frame = "*New LLM Request*\n\n*Prompt:*\n\n\n*Response:*\n";
        let response: String = response.chars().take(TELEGRAM_MAX_CHARS / 2).collect();
        let budget = TELEGRAM_MAX_CHARS
            .saturating_sub(frame.chars().count())
            .saturating_sub(response.chars().count());

        let prompt = if prompt.chars().count() > budget {
            let mut short: String = prompt.chars().take(budget.saturating_sub(1)).collect();
            short.push('…');
            short
        } else {
            prompt.to_string()
        };

        format!("*New LLM Request*\n\n*Prompt:*\n{prompt}\n\n*Response:*\n{response}")
    }
}

#[async_trait]
impl AuditSink for TelegramAuditSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn record(&self, prompt: &str, response: &str) -> std::result::Result<(), AuditError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: Self::format_message(prompt, response),
            parse_mode: "Markdown",
        };

        let reply = self
            .client
            .post(&self.endpoint)
            .form(&payload)
            .send()
            .await
            .map_err(|e| AuditError::Delivery(e.without_url().to_string()))?;

        if !reply.status().is_success() {
            return Err(AuditError::Rejected(reply.status().as_u16()));
        }
        Ok(())
    }
}

/// Telegram when enabled and configured, the log sink otherwise
pub fn create_audit_sink(config: &AuditConfig) -> Result<Arc<dyn AuditSink>> {
    match (
        config.enabled,
        config.telegram_bot_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    ) {
        (true, Some(token), Some(chat_id)) => {
            tracing::info!("Telegram audit sink enabled");
            Ok(Arc::new(TelegramAuditSink::new(
                &config.telegram_api_base,
                token,
                chat_id.to_string(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        _ => Ok(Arc::new(LogAuditSink)),
    }
}
