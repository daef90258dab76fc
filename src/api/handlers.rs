//! HTTP request handlers for the document and chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::DocumentProcessor;
use crate::rag::{AnswerComposer, SourceRef};
use crate::store::DocumentStore;
use crate::types::{ChunkMatch, DocumentStatus};

/// Application state shared across handlers.
pub struct AppState {
    pub processor: DocumentProcessor,
    pub composer: AnswerComposer,
    pub documents: Arc<dyn DocumentStore>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Error body returned to clients; a summary without internal detail.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn api_error(status: StatusCode, error: &str, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Request to process (or reprocess) an uploaded document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentRequest {
    pub document_id: Uuid,
}

/// Outcome of a processing run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentResponse {
    pub success: bool,
    pub document_id: Uuid,
    pub chunks_processed: usize,
    pub total_chunks: usize,
    pub status: DocumentStatus,
}

/// Run the ingestion pipeline for one document.
///
/// Also serves reprocess requests: a run from a terminal state replaces
/// the document's chunk set.
pub async fn process_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessDocumentRequest>,
) -> Result<Json<ProcessDocumentResponse>, ApiError> {
    info!(document_id = %request.document_id, "Received document processing request");

    match state.processor.process(request.document_id).await {
        Ok(outcome) => Ok(Json(ProcessDocumentResponse {
            success: outcome.success(),
            document_id: outcome.document_id,
            chunks_processed: outcome.chunks_processed,
            total_chunks: outcome.total_chunks,
            status: outcome.status,
        })),
        Err(PipelineError::NotFound(id)) => Err(api_error(
            StatusCode::NOT_FOUND,
            "Document not found",
            Some(id.to_string()),
        )),
        Err(err) => {
            error!(document_id = %request.document_id, error = %err, "Document processing failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                Some(err.to_string()),
            ))
        }
    }
}

/// Document status summary for polling clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatusResponse {
    pub id: Uuid,
    pub status: DocumentStatus,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Get a document's lifecycle status.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentStatusResponse>, ApiError> {
    match state.documents.get_document(document_id).await {
        Ok(document) => Ok(Json(DocumentStatusResponse {
            id: document.id,
            status: document.status,
            chunk_count: document.chunk_count,
            processed_at: document.processed_at,
            updated_at: document.updated_at,
        })),
        Err(PipelineError::NotFound(id)) => Err(api_error(
            StatusCode::NOT_FOUND,
            "Document not found",
            Some(id.to_string()),
        )),
        Err(err) => {
            error!(document_id = %document_id, error = %err, "Document lookup failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Document lookup failed",
                None,
            ))
        }
    }
}

/// Chat request scoped to one category.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub category_id: Uuid,
}

/// Grounded chat answer with its sources.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub sources: Vec<SourceRef>,
}

/// Answer a user message from the documents of one category.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is required", None));
    }

    info!(category_id = %request.category_id, "Received chat message");

    match state
        .composer
        .answer(&request.message, request.category_id)
        .await
    {
        Ok(answer) => Ok(Json(ChatResponse {
            message: answer.message,
            sources: answer.sources,
        })),
        Err(err) => {
            error!(category_id = %request.category_id, error = %err, "Chat generation failed");
            // Internal detail stays in the logs; clients get a summary.
            let summary = match err {
                PipelineError::Embedding(_) => "failed to embed the message",
                PipelineError::Completion(_) => "failed to generate a response",
                _ => "failed to search documents",
            };
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Chat generation failed",
                Some(summary.to_string()),
            ))
        }
    }
}

/// Generic similarity search request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub category_id: Uuid,
}

/// Ranked search results.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ChunkMatch>,
}

/// Search one category's chunks without composing an answer.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Query is required", None));
    }

    match state
        .composer
        .search_chunks(&request.query, request.category_id)
        .await
    {
        Ok(results) => Ok(Json(SearchResponse { results })),
        Err(err) => {
            error!(category_id = %request.category_id, error = %err, "Search failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Search failed",
                None,
            ))
        }
    }
}
