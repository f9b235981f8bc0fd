//! HTTP request handlers

use super::types::{ConversationResponse, ErrorResponse, InboundSmsForm};
use super::AppState;
use crate::phone::normalize_phone;
use crate::runtime::{Acknowledgement, EngineError, Responder};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Carrier webhook
        .route("/sms/inbound", post(receive_sms))
        // Inspection
        .route("/api/conversations/:phone", get(get_conversation))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Inbound Messages
// ============================================================

/// Always answers 200 with a plain-text acknowledgement once the sender is
/// known, so the carrier never redelivers.
async fn receive_sms(
    State(state): State<AppState>,
    Form(form): Form<InboundSmsForm>,
) -> Result<Response, AppError> {
    let event = form
        .into_event()
        .ok_or_else(|| AppError::BadRequest("Missing or invalid From number".to_string()))?;

    // The pipeline runs on its own task so a dropped request cannot stop it
    // between commit and reply.
    let (responder, ack_rx) = Responder::channel();
    let engine = Arc::clone(&state.engine);
    tokio::spawn(async move {
        match engine.handle(event, responder).await {
            Ok(report) => tracing::debug!(
                phone = %report.phone,
                state = %report.state,
                advanced = report.advanced(),
                opted_out = report.opted_out,
                reply = ?report.reply,
                "Inbound message handled"
            ),
            Err(e @ EngineError::Delivery { .. }) => {
                tracing::error!(error = %e, "Reply lost after state change");
            }
            Err(e) => tracing::error!(error = %e, "Inbound message not processed"),
        }
    });

    let ack = ack_rx.await.unwrap_or(Acknowledgement::Received);
    Ok(([(header::CONTENT_TYPE, ack.content_type())], ack.body()).into_response())
}

// ============================================================
// Inspection
// ============================================================

async fn get_conversation(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let phone = normalize_phone(&phone)
        .ok_or_else(|| AppError::BadRequest(format!("Not a phone number: {phone}")))?;
    let record = state
        .db
        .get_record(&phone)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("No conversation for {phone}")))?;
    Ok(Json(record.into()))
}

async fn get_version() -> &'static str {
    concat!("sms-intake ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
