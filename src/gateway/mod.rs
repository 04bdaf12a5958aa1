//! HTTP gateway exposing the agent to the browser front-end.

pub mod api;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

use crate::agent::Agent;
use crate::config::{Config, GatewayConfig};
use crate::tools::planning::sample_planning_data;
use crate::tools::TableData;

/// Shared handler state; the agent is read-only across requests.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    /// Table the follow-up actions run against.
    pub data: Arc<TableData>,
}

impl AppState {
    /// State serving the built-in planning sample.
    pub fn new(agent: Agent) -> Self {
        Self {
            agent: Arc::new(agent),
            data: Arc::new(sample_planning_data()),
        }
    }
}

pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::handle_health))
        .route("/api/tools", get(api::handle_tools))
        .route("/api/chat", post(api::handle_chat))
        .route("/api/actions", post(api::handle_actions))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let agent = Agent::from_config(&config)?;
    let app = build_router(AppState::new(agent), &config.gateway);

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind gateway to {host}:{port}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, pipeline = %config.agent.pipeline, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::ScriptedProvider;
    use crate::agent::PipelineKind;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(kind: PipelineKind, provider: ScriptedProvider, config: &GatewayConfig) -> Router {
        let agent = Agent::builder()
            .pipeline(kind)
            .provider(Arc::new(provider))
            .build()
            .unwrap();
        build_router(AppState::new(agent), config)
    }

    fn app(kind: PipelineKind, provider: ScriptedProvider) -> Router {
        app_with(kind, provider, &GatewayConfig::default())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn chat_request(body: &str) -> Request<Body> {
        post_json("/api/chat", body)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn tools_lists_active_pipeline_tools() {
        let response = app(PipelineKind::Tabular, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(Request::builder().uri("/api/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "update_spreadsheet");
        assert!(tools[0]["parameters"].is_object());
    }

    #[tokio::test]
    async fn read_message_returns_acknowledgement_and_query_type() {
        let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(chat_request(r#"{"message": "show me all users"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "response": "Data read operation processed successfully",
                "query_type": "read",
                "suggested_actions": []
            })
        );
    }

    #[tokio::test]
    async fn write_message_falls_back_and_suggests_actions() {
        let provider = ScriptedProvider::new(["Updated. I can show a chart of the trend."]);
        let response = app(PipelineKind::Router, provider)
            .oneshot(chat_request(r#"{"message": "add 10% to chairs"}"#))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["query_type"], "write");
        assert_eq!(
            body["suggested_actions"],
            json!(["show_data", "show_chart", "run_analysis"])
        );
    }

    #[tokio::test]
    async fn tabular_reply_includes_data_records() {
        let provider = ScriptedProvider::new(["use tool get_planning_data", "Here it is."]);
        let response = app(PipelineKind::Tabular, provider)
            .oneshot(chat_request(r#"{"message": "fetch planning data"}"#))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["response"], "Here it is.");
        assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
        assert!(body.get("query_type").is_none());
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        for payload in [r#"{"message": "   "}"#, "{}"] {
            let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
                .oneshot(chat_request(payload))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
            assert!(json_body(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_with_json_error() {
        let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(chat_request("not json"))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn processing_failure_is_500_with_scrubbed_error() {
        let provider = ScriptedProvider::failing("upstream rejected key sk-live-abcdef123456");
        let response = app(PipelineKind::AgentLoop, provider)
            .oneshot(chat_request(r#"{"message": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("upstream rejected key"));
        assert!(!error.contains("abcdef123456"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = GatewayConfig {
            max_body_bytes: 16,
            ..GatewayConfig::default()
        };
        let body = format!(r#"{{"message": "{}"}}"#, "x".repeat(64));
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = app_with(
            PipelineKind::Router,
            ScriptedProvider::new(Vec::<&str>::new()),
            &config,
        )
        .oneshot(request)
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    async fn action(body: &str) -> (StatusCode, Value) {
        let response = app(PipelineKind::Router, ScriptedProvider::new(Vec::<&str>::new()))
            .oneshot(post_json("/api/actions", body))
            .await
            .unwrap();
        let status = response.status();
        (status, json_body(response).await)
    }

    #[tokio::test]
    async fn chart_action_groups_planning_data() {
        let (status, body) = action(
            r#"{"action_type": "show_chart", "action_data": {"groupBy": "region", "aggregation": "average", "measure": "measure2"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["result"]["labels"],
            json!(["Asia Pacific", "Europe", "North America"])
        );
        assert_eq!(body["result"]["values"], json!([1275.75, 1015.25, 345.0]));
    }

    #[tokio::test]
    async fn analysis_action_returns_trends() {
        let (status, body) = action(r#"{"action_type": "run_analysis"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["trends"]["2024-02"]["variance"], json!(46.25));
    }

    #[tokio::test]
    async fn unknown_or_missing_action_type_is_bad_request() {
        let (status, body) = action(r#"{"action_type": "export_pdf"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported action type: export_pdf");

        let (status, body) = action(r#"{"action_data": {}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
