//! REST handlers for the browser front-end.

use super::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::{run_action, suggest_actions, ActionRequest, QueryType, SuggestedAction};
use crate::providers::sanitize_api_error;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Map<String, Value>>>,
    pub suggested_actions: Vec<SuggestedAction>,
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub action_data: Value,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// GET /health
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/tools: tool specs of the active pipeline
pub async fn handle_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "tools": state.agent.tools() }))
}

/// POST /api/chat: process one message
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    let message = request.message.unwrap_or_default();
    if message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    match state.agent.process_message(&message).await {
        Ok(reply) => {
            let suggested_actions = suggest_actions(reply.response());
            let query_type = reply.query_type();
            let data = reply.data().map(<[_]>::to_vec);
            Json(ChatResponse {
                response: reply.into_response(),
                query_type,
                data,
                suggested_actions,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "chat request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                sanitize_api_error(&format!("{e:#}")),
            )
        }
    }
}

/// POST /api/actions: run a suggested action against the planning data
pub async fn handle_actions(
    State(state): State<AppState>,
    body: Result<Json<ActionBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    let Some(action_type) = body.action_type.filter(|t| !t.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "action_type must not be empty");
    };

    let result = ActionRequest::parse(action_type.trim(), body.action_data)
        .and_then(|request| run_action(&request, &state.data));
    match result {
        Ok(result) => Json(serde_json::json!({ "result": result })).into_response(),
        Err(e) if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, "action failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
