//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub store: StoreCheck,
    pub generation: GenerationCheck,
}

#[derive(Serialize)]
pub struct StoreCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Configured backends, not probed
#[derive(Serialize)]
pub struct GenerationCheck {
    pub status: String,
    /// Fallback order
    pub backends: Vec<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: deedlens_common::VERSION,
    })
}

/// Readiness probe - pings the document store and lists the answer chain
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let started = std::time::Instant::now();

    let store = match state.service.store().ping().await {
        Ok(()) => StoreCheck {
            status: "up".to_string(),
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Document store ping failed");
            StoreCheck {
                status: "down".to_string(),
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let backends: Vec<String> = state
        .service
        .chain()
        .backend_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let generation = GenerationCheck {
        status: if backends.is_empty() { "unconfigured" } else { "configured" }.to_string(),
        backends,
    };

    let ready = store.status == "up" && generation.status == "configured";

    Json(ReadyResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        checks: ReadyChecks { store, generation },
    })
}
