//! Configuration management for DeedLens services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/<env>.toml, config/local.toml)
//! - Default values
//!
//! The synonym table and the backend order live here as plain data. They are
//! turned into immutable objects once at startup and handed to the resolver
//! and the answer chain explicitly.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Token window configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Fuzzy matching configuration
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Orchestration limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Generation backends, in fallback order
    #[serde(default)]
    pub llm: LlmConfig,

    /// Audit sink configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Phrase to canonical attribute mapping, in lookup order
    #[serde(default = "default_synonyms")]
    pub synonyms: Vec<SynonymEntry>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Which document store implementation to use
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Documents loaded once from a JSON file
    Json,
    /// MySQL table of extracted documents
    Mysql,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,

    /// Path of the JSON document file (kind = "json")
    pub path: Option<String>,

    /// Database URL (kind = "mysql")
    pub url: Option<String>,

    /// Table holding the documents
    #[serde(default = "default_table")]
    pub table: String,

    /// Whether the table carries an `owner_name` column
    #[serde(default)]
    pub has_owner_column: bool,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Window size in whitespace tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens shared by consecutive windows
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Minimum fuzzy score (0-100) for a document to be selected
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Documents returned by a keyword content search
    #[serde(default = "default_keyword_limit")]
    pub keyword_search_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Ranked chunks tried per document before regex fallback (unset = all)
    pub max_chunk_attempts: Option<usize>,

    /// Comparisons over more documents than this log a latency warning
    #[serde(default = "default_compare_warn")]
    pub compare_warn_threshold: usize,
}

/// Wire protocol spoken by a generation backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Ollama `/api/generate`
    Ollama,
    /// OpenAI-compatible `/chat/completions` (OpenAI, OpenRouter)
    Openai,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Name used in logs and metrics
    pub name: String,

    pub provider: ProviderKind,

    /// API base URL
    pub base_url: String,

    /// Model to use
    pub model: String,

    /// API key, if set inline
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-backend timeout override in seconds
    pub timeout_secs: Option<u64>,
}

impl BackendConfig {
    /// Inline key first, then the named environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Default timeout applied to every backend call, in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Forward prompt/response pairs to Telegram
    #[serde(default)]
    pub enabled: bool,

    pub telegram_bot_token: Option<String>,

    pub telegram_chat_id: Option<String>,

    #[serde(default = "default_telegram_api")]
    pub telegram_api_base: String,

    /// Timeout for a single delivery, in seconds
    #[serde(default = "default_audit_timeout")]
    pub timeout_secs: u64,
}

/// One row of the synonym table
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SynonymEntry {
    pub phrase: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_store_kind() -> StoreKind { StoreKind::Json }
fn default_table() -> String { "updated_documents".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_max_tokens() -> usize { 1000 }
fn default_overlap() -> usize { 200 }
fn default_threshold() -> f64 { 40.0 }
fn default_keyword_limit() -> usize { 5 }
fn default_compare_warn() -> usize { 5 }
fn default_temperature() -> f32 { 0.3 }
fn default_llm_timeout() -> u64 { 10 }
fn default_telegram_api() -> String { "https://api.telegram.org".to_string() }
fn default_audit_timeout() -> u64 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "deedlens".to_string() }

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            name: "ollama".to_string(),
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            api_key: None,
            api_key_env: None,
            temperature: default_temperature(),
            timeout_secs: None,
        },
        BackendConfig {
            name: "openrouter".to_string(),
            provider: ProviderKind::Openai,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "mistralai/mixtral-8x7b-instruct".to_string(),
            api_key: None,
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
            temperature: default_temperature(),
            timeout_secs: None,
        },
    ]
}

fn default_synonyms() -> Vec<SynonymEntry> {
    [
        ("jantry value", "jantry_rate"),
        ("jantri value", "jantry_rate"),
        ("jantry rate", "jantry_rate"),
        ("market value", "market_value"),
        ("distress value", "distress_value"),
        ("owner name", "owner"),
        ("file id", "file_id"),
    ]
    .into_iter()
    .map(|(phrase, canonical)| SynonymEntry {
        phrase: phrase.to_string(),
        canonical: canonical.to_string(),
    })
    .collect()
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config: Self = Self::builder_for(path)?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn builder_for(path: &str) -> std::result::Result<Config, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 || self.chunking.overlap >= self.chunking.max_tokens {
            return Err(AppError::InvalidChunking {
                max_tokens: self.chunking.max_tokens,
                overlap: self.chunking.overlap,
            });
        }

        if !(0.0..=100.0).contains(&self.matching.threshold) {
            return Err(AppError::Configuration {
                message: format!(
                    "matching.threshold must be within 0..=100, got {}",
                    self.matching.threshold
                ),
            });
        }

        if self.llm.backends.is_empty() {
            return Err(AppError::Configuration {
                message: "llm.backends must list at least one backend".to_string(),
            });
        }

        if self.audit.enabled
            && (self.audit.telegram_bot_token.is_none() || self.audit.telegram_chat_id.is_none())
        {
            return Err(AppError::Configuration {
                message: "audit.enabled requires telegram_bot_token and telegram_chat_id"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Effective timeout for one backend
    pub fn backend_timeout(&self, backend: &BackendConfig) -> Duration {
        Duration::from_secs(backend.timeout_secs.unwrap_or(self.llm.timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            path: Some("data/documents.json".to_string()),
            url: None,
            table: default_table(),
            has_owner_column: false,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap: default_overlap(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            keyword_search_limit: default_keyword_limit(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_attempts: None,
            compare_warn_threshold: default_compare_warn(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout(),
            backends: default_backends(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: default_telegram_api(),
            timeout_secs: default_audit_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}
