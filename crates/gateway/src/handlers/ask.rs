//! Question answering handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use deedlens_common::{
    errors::{AppError, Result},
    models::Document,
    QueryOutcome,
};

/// Ask request.
///
/// Documents come from `query` when given, narrowed to `document_ids`.
/// Without a query, `document_ids` are looked up directly (404 when none
/// exist), and with neither the question's keywords select documents.
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub query: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub document_ids: Vec<String>,
}

/// Ask response
#[derive(Serialize)]
pub struct AskResponse {
    pub question: String,
    pub documents: Vec<DocumentSummary>,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub property_name: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            property_name: doc.property_name.clone(),
        }
    }
}

/// Answer a question, or build a comparison table, over the selected documents
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    if request.question.trim().is_empty() {
        return Err(AppError::Validation {
            message: "question must not be blank".to_string(),
            field: Some("question".to_string()),
        });
    }

    let documents = state
        .service
        .select_documents(
            request.query.as_deref(),
            &request.document_ids,
            &request.question,
        )
        .await?;

    let explicit_only = request.query.as_deref().map_or(true, |q| q.trim().is_empty());
    if explicit_only && !request.document_ids.is_empty() && documents.is_empty() {
        return Err(AppError::DocumentNotFound {
            id: request.document_ids.join(","),
        });
    }

    let outcome = state.service.ask(&request.question, &documents).await;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        documents = documents.len(),
        latency_ms = processing_time_ms,
        "Question answered"
    );

    Ok(Json(AskResponse {
        question: request.question,
        documents: documents.iter().map(DocumentSummary::from).collect(),
        outcome,
        processing_time_ms,
    }))
}
