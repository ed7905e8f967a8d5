use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use careguide_generation::{CompletionClient, GenerationConfig, GenerationError, Generator};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct MockState {
    reply: Arc<(StatusCode, Value)>,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn completions(State(state): State<MockState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.seen.lock().unwrap().push(body);
    let (status, reply) = &*state.reply;
    (*status, Json(reply.clone()))
}

async fn spawn_mock(status: StatusCode, reply: Value) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        reply: Arc::new((status, reply)),
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/", get(|| async { "LM Studio is running" }))
        .route("/v1/completions", post(completions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn client_for(addr: SocketAddr) -> CompletionClient {
    CompletionClient::new(GenerationConfig {
        url: format!("http://{addr}/v1/completions"),
        timeout_secs: 10,
        ..GenerationConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn generate_posts_prompt_and_trims_first_choice() {
    let (addr, seen) = spawn_mock(
        StatusCode::OK,
        json!({"choices": [{"text": "  Give 15 mg/kg.\n"}, {"text": "ignored"}]}),
    )
    .await;

    let answer = client_for(addr).generate("What dose?").await.unwrap();
    assert_eq!(answer, "Give 15 mg/kg.");

    let requests = seen.lock().unwrap();
    assert_eq!(
        requests.as_slice(),
        &[json!({
            "model": "mistral",
            "prompt": "What dose?",
            "max_tokens": 512,
            "temperature": 0.5
        })]
    );
}

#[tokio::test]
async fn missing_choice_is_malformed() {
    let (addr, _) = spawn_mock(StatusCode::OK, json!({"choices": []})).await;
    let result = client_for(addr).generate("Q").await;
    assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));

    let (addr, _) = spawn_mock(StatusCode::OK, json!({"id": "cmpl-1"})).await;
    let result = client_for(addr).generate("Q").await;
    assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn http_error_status_is_upstream() {
    let (addr, seen) = spawn_mock(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "model not loaded"}),
    )
    .await;
    let result = client_for(addr).generate("Q").await;
    assert!(matches!(result, Err(GenerationError::Upstream(_))));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn probe_reports_running_server() {
    let (addr, _) = spawn_mock(StatusCode::OK, json!({})).await;
    assert!(client_for(addr).is_online().await);
}

#[tokio::test]
async fn probe_and_generate_fail_without_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    assert!(!client.is_online().await);
    assert!(matches!(
        client.generate("Q").await,
        Err(GenerationError::Upstream(_))
    ));
}
