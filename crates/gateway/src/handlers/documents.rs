//! Document matching handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use deedlens_common::{
    errors::{AppError, Result},
    models::Match,
};

/// Match request
#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    /// File id, property name or owner name
    #[validate(length(min = 1, max = 500))]
    pub query: String,
}

/// Match response
#[derive(Serialize)]
pub struct MatchResponse {
    pub query: String,
    pub total: usize,
    pub matches: Vec<MatchItem>,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
pub struct MatchItem {
    pub id: String,
    pub property_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub score: f64,
}

impl From<Match> for MatchItem {
    fn from(m: Match) -> Self {
        Self {
            id: m.document.id,
            property_name: m.document.property_name,
            owner_name: m.document.owner_name,
            score: m.score,
        }
    }
}

/// Find documents by id, property name or owner name
pub async fn match_documents(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let matches = state.service.find_documents(&request.query).await?;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %request.query,
        matches = matches.len(),
        latency_ms = processing_time_ms,
        "Document match completed"
    );

    Ok(Json(MatchResponse {
        query: request.query,
        total: matches.len(),
        matches: matches.into_iter().map(MatchItem::from).collect(),
        processing_time_ms,
    }))
}
