//! `ApiClient` against an in-process counter API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use counterlink_core::policy::RetryConfig;
use counterlink_http::{ApiClient, ApiClientConfig, ApiError};

#[derive(Clone, Default)]
struct Counters {
    health_calls: Arc<AtomicUsize>,
    add_calls: Arc<AtomicUsize>,
    /// Remaining `/health` calls that answer 503.
    flaky: Arc<AtomicUsize>,
}

async fn root() -> Json<Value> {
    Json(json!({"message": "counter api", "apiBase": "/"}))
}

async fn health(State(counters): State<Counters>) -> (StatusCode, Json<Value>) {
    counters.health_calls.fetch_add(1, Ordering::SeqCst);
    let remaining = counters.flaky.load(Ordering::SeqCst);
    if remaining > 0 {
        counters.flaky.store(remaining - 1, Ordering::SeqCst);
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "starting"})));
    }
    (StatusCode::OK, Json(json!({"status": "ok", "message": "healthy"})))
}

async fn add(
    State(counters): State<Counters>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    counters.add_calls.fetch_add(1, Ordering::SeqCst);
    let parse = |key: &str| {
        params
            .get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    match (parse("a"), parse("b")) {
        (Some(a), Some(b)) => (StatusCode::OK, Json(json!({"result": a + b}))),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "a and b must be numbers"})),
        ),
    }
}

async fn spawn_api(counters: Counters) -> String {
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/add", get(add))
        .with_state(counters);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_retry(max_retries: u32) -> ApiClientConfig {
    ApiClientConfig {
        retry: RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            multiplier: 2.0,
        },
        request_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn health_and_info() {
    let base = spawn_api(Counters::default()).await;
    let client = ApiClient::default_for(&base).unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.message, "healthy");

    let info = client.info().await.unwrap();
    assert_eq!(info.message, "counter api");
    assert_eq!(info.api_base.as_deref(), Some("/"));
}

#[tokio::test]
async fn add_returns_sum() {
    let base = spawn_api(Counters::default()).await;
    let client = ApiClient::default_for(&base).unwrap();

    assert_eq!(client.add(5.0, 3.0).await.unwrap(), 8.0);
    assert_eq!(client.add(-1.5, 0.25).await.unwrap(), -1.25);
}

#[tokio::test]
async fn invalid_add_is_rejected_without_retry() {
    let counters = Counters::default();
    let base = spawn_api(counters.clone()).await;
    let client = ApiClient::new(&base, fast_retry(3)).unwrap();

    let err = client.add(f64::NAN, 1.0).await.unwrap_err();
    match err {
        ApiError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "a and b must be numbers");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(counters.add_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let counters = Counters::default();
    counters.flaky.store(2, Ordering::SeqCst);
    let base = spawn_api(counters.clone()).await;
    let client = ApiClient::new(&base, fast_retry(3)).unwrap();

    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(counters.health_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_give_up_after_budget() {
    let counters = Counters::default();
    counters.flaky.store(10, Ordering::SeqCst);
    let base = spawn_api(counters.clone()).await;
    let client = ApiClient::new(&base, fast_retry(1)).unwrap();

    let err = client.health().await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert_eq!(counters.health_calls.load(Ordering::SeqCst), 2);
}
