//! Drives the router pipeline through real HTTP against local stand-ins for
//! the remote query endpoint and the hosted model.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use planchat::agent::{ChatReply, PipelineKind, QueryType};
use planchat::{Agent, Config};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type Recorded = Arc<Mutex<Vec<Value>>>;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// OpenAI-compatible stand-in that echoes the last user message.
async fn fake_model() -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(|State(seen): State<Recorded>, Json(body): Json<Value>| async move {
                let last = body["messages"]
                    .as_array()
                    .and_then(|m| m.last())
                    .and_then(|m| m["content"].as_str())
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(body);
                Json(json!({
                    "choices": [{"message": {"content": format!("model saw: {last}")}}]
                }))
            }),
        )
        .with_state(recorded.clone());
    (format!("{}/v1", serve(router).await), recorded)
}

async fn endpoint(status: StatusCode) -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let router = Router::new()
        .route(
            "/score",
            post(move |State(seen): State<Recorded>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                (status, Json(json!({ "sql_query": UPDATE_SQL }))).into_response()
            }),
        )
        .with_state(recorded.clone());
    (format!("{}/score", serve(router).await), recorded)
}

fn config(model_url: &str, endpoint_url: Option<&str>) -> Config {
    let mut config = Config::default();
    config.default_provider = Some(format!("custom:{model_url}"));
    config.api_key = Some("test-model-key".into());
    config.default_model = Some("gpt-test".into());
    config.agent.pipeline = PipelineKind::Router;
    config.endpoint.url = endpoint_url.map(str::to_string);
    config.endpoint.api_key = Some("endpoint-token".into());
    config.endpoint.timeout_secs = 5;
    config.validate().unwrap();
    config
}

const UPDATE_SQL: &str = "UPDATE forecast SET measure1 = measure1 * 1.1";

const FORECAST: &str = "please add 10% to Comfortable Office Chair Asia Pacific Region for all \
                        months and save it to forecast version";

#[tokio::test]
async fn write_request_is_answered_by_endpoint() {
    let (model_url, model_calls) = fake_model().await;
    let (endpoint_url, endpoint_calls) = endpoint(StatusCode::OK).await;
    let agent = Agent::from_config(&config(&model_url, Some(&endpoint_url))).unwrap();

    let reply = agent.process_message(FORECAST).await.unwrap();
    assert_eq!(
        reply,
        ChatReply::Routed {
            response: UPDATE_SQL.into(),
            query_type: QueryType::Write,
        }
    );
    assert_eq!(endpoint_calls.lock().unwrap()[0], json!({"input_text": FORECAST}));
    assert!(model_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_endpoint_falls_back_to_hosted_model() {
    let (model_url, model_calls) = fake_model().await;
    let (endpoint_url, endpoint_calls) = endpoint(StatusCode::SERVICE_UNAVAILABLE).await;
    let agent = Agent::from_config(&config(&model_url, Some(&endpoint_url))).unwrap();

    let reply = agent.process_message("Delete stale rows").await.unwrap();
    assert_eq!(reply.response(), "model saw: Delete stale rows");
    assert_eq!(reply.query_type(), Some(QueryType::Write));
    assert_eq!(endpoint_calls.lock().unwrap().len(), 1);

    let calls = model_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["model"], "gpt-test");
    assert_eq!(
        calls[0]["messages"],
        json!([{"role": "user", "content": "Delete stale rows"}])
    );
}

#[tokio::test]
async fn unconfigured_endpoint_falls_back_to_hosted_model() {
    let (model_url, model_calls) = fake_model().await;
    let agent = Agent::from_config(&config(&model_url, None)).unwrap();

    let reply = agent.process_message("increase budget").await.unwrap();
    assert_eq!(reply.response(), "model saw: increase budget");
    assert_eq!(model_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn read_request_touches_no_service() {
    let (model_url, model_calls) = fake_model().await;
    let (endpoint_url, endpoint_calls) = endpoint(StatusCode::OK).await;
    let agent = Agent::from_config(&config(&model_url, Some(&endpoint_url))).unwrap();

    let reply = agent.process_message("Show me all users").await.unwrap();
    assert_eq!(reply.response(), "Data read operation processed successfully");
    assert_eq!(reply.query_type(), Some(QueryType::Read));
    assert!(endpoint_calls.lock().unwrap().is_empty());
    assert!(model_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_requests_keep_private_state() {
    let (model_url, _) = fake_model().await;
    let agent = Arc::new(Agent::from_config(&config(&model_url, None)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let agent = agent.clone();
            tokio::spawn(async move { agent.process_message(&format!("add item {i}")).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply.response(), format!("model saw: add item {i}"));
    }
}
