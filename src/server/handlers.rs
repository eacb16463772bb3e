use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{AppState, AskReply};
use crate::error::RagError;

#[derive(Deserialize)]
pub(crate) struct AskRequest {
    question: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn status_for(err: &RagError) -> StatusCode {
    if err.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else if err.is_provider_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub(crate) async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Response {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "question must not be empty");
    }

    let engine = state.engine.clone();
    match tokio::task::spawn_blocking(move || engine.ask(&question)).await {
        Ok(Ok(response)) => Json(AskReply::from(response)).into_response(),
        Ok(Err(e)) => {
            error!("ask failed: {e}");
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => {
            error!("ask task panicked: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn root_handler() -> impl IntoResponse {
    Json(json!({ "status": "startup" }))
}
