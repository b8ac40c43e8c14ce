//! Ingest, metrics and health handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;
use crate::pipeline::{Message, PipelineError, Service};
use crate::resilience::CircuitState;

/// `POST /ingest` payload.
///
/// Missing fields decode as empty so they fail validation, not parsing.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub circuit_breaker_state: u8,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<&'static str>,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = match self {
            PipelineError::Validation(reason) => reason,
            PipelineError::QueueFull => "Queue full".to_string(),
            PipelineError::ShuttingDown => "Service shutting down".to_string(),
        };
        (status, body).into_response()
    }
}

pub async fn ingest(
    State(service): State<Arc<Service>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // Oversized or unreadable bodies count as rejected ingests too.
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            service.metrics().record_error();
            tracing::debug!(error = %rejection, "Rejected ingest body");
            return rejection.into_response();
        }
    };

    let result = parse_message(&body)
        .inspect_err(|e| {
            service.metrics().record_error();
            tracing::debug!(error = %e, "Rejected ingest payload");
        })
        .and_then(|message| service.submit(message));

    match result {
        Ok(()) => (StatusCode::ACCEPTED, Json(IngestAccepted { status: "accepted" })).into_response(),
        Err(e) => e.into_response(),
    }
}

fn parse_message(body: &[u8]) -> Result<Message, PipelineError> {
    let request: IngestRequest = serde_json::from_slice(body)
        .map_err(|_| PipelineError::Validation("Invalid payload".to_string()))?;
    Message::new(request.bot_id, request.content, request.timestamp)
}

pub async fn metrics(State(service): State<Arc<Service>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        counters: service.metrics().snapshot(),
        circuit_breaker_state: service.circuit_breaker().state().as_u8(),
    })
}

pub async fn health(State(service): State<Arc<Service>>) -> Json<HealthResponse> {
    let circuit_breaker = match service.circuit_breaker().state() {
        CircuitState::Open => Some("open"),
        _ => None,
    };

    Json(HealthResponse {
        status: "healthy",
        queue: format!(
            "{}/{}",
            service.metrics().queue_depth(),
            service.queue_capacity()
        ),
        circuit_breaker,
    })
}
