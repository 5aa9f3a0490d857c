//! MedBot HTTP REST API
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! taking the assistant directly, so the logic is testable without axum
//! dispatch. Every inner function goes through the request router.
//!
//! Endpoints:
//! | route           | body                 | returns                        |
//! |-----------------|----------------------|--------------------------------|
//! | `GET /health`   |                      | index and provider status      |
//! | `GET /version`  |                      | crate version, protocol tag    |
//! | `GET /topics`   |                      | loaded corpus files            |
//! | `POST /classify`| `{query}`            | intent                         |
//! | `POST /ask`     | `{query, mode?}`     | reply with matches and timing  |
//! | `POST /lookup`  | `{kind, name}`       | first matching record or 404   |

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use medbot_core::protocol::{AskMode, MedbotRequest, MedbotResponse};
use medbot_core::EntityKind;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::assistant::Assistant;
use crate::router::handle_request;

/// State handed to every handler.
#[derive(Clone)]
pub struct HttpState {
    pub assistant: Arc<Assistant>,
}

/// Routes for the REST surface, with `state` attached.
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/topics", get(topics_handler))
        .route("/classify", post(classify_handler))
        .route("/ask", post(ask_handler))
        .route("/lookup", post(lookup_handler))
        .with_state(state)
}

/// Serve on the configured address until `shutdown` resolves.
pub async fn start_http_server(
    assistant: Arc<Assistant>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let http = &assistant.config().http;
    let addr = format!("{}:{}", http.host, http.port);
    let state = Arc::new(HttpState {
        assistant: assistant.clone(),
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("MedBot HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("HTTP listener closed");
        })
        .await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub mode: AskMode,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub kind: Option<String>,
    pub name: Option<String>,
}

/// Body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::json!(ErrorResponse::new(msg)),
    )
}

/// Non-blank trimmed text, or `None`.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

pub async fn health_inner(assistant: &Assistant) -> (StatusCode, serde_json::Value) {
    let response = handle_request(MedbotRequest::Health, assistant).await;
    match response_to_http(response) {
        Ok(mut data) => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert("version".to_string(), serde_json::json!(env!("CARGO_PKG_VERSION")));
            }
            (StatusCode::OK, data)
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e,
            }),
        ),
    }
}

/// Static version payload.
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "medbot/1",
    })
}

pub async fn topics_inner(assistant: &Assistant) -> (StatusCode, serde_json::Value) {
    let response = handle_request(MedbotRequest::Topics, assistant).await;
    into_http(response)
}

pub async fn classify_inner(
    assistant: &Assistant,
    req: ClassifyRequest,
) -> (StatusCode, serde_json::Value) {
    let Some(query) = required(req.query) else {
        return bad_request("query field is required");
    };
    into_http(handle_request(MedbotRequest::Classify { query }, assistant).await)
}

/// Validates the query, routes it and stamps the elapsed time.
pub async fn ask_inner(assistant: &Assistant, req: AskRequest) -> (StatusCode, serde_json::Value) {
    let Some(query) = required(req.query) else {
        return bad_request("query field is required");
    };

    let start = Instant::now();
    let response = handle_request(
        MedbotRequest::Ask {
            query,
            mode: req.mode,
        },
        assistant,
    )
    .await;
    let took_ms = start.elapsed().as_millis() as u64;

    let (status, mut body) = into_http(response);
    if status == StatusCode::OK {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("took_ms".to_string(), serde_json::json!(took_ms));
        }
    }
    (status, body)
}

pub async fn lookup_inner(
    assistant: &Assistant,
    req: LookupRequest,
) -> (StatusCode, serde_json::Value) {
    let (Some(kind), Some(name)) = (required(req.kind), required(req.name)) else {
        return bad_request("kind and name fields are required");
    };
    let kind: EntityKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => return bad_request(format!("{}", e)),
    };

    let response = handle_request(MedbotRequest::Lookup { kind, name }, assistant).await;
    let (status, body) = into_http(response);
    if status == StatusCode::OK && body["found"] == false {
        return (StatusCode::NOT_FOUND, body);
    }
    (status, body)
}

// Axum wrappers. No logic lives here.

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.assistant).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn topics_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = topics_inner(&state.assistant).await;
    (status, Json(body))
}

pub async fn classify_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ClassifyRequest>,
) -> impl IntoResponse {
    let (status, body) = classify_inner(&state.assistant, req).await;
    (status, Json(body))
}

pub async fn ask_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let (status, body) = ask_inner(&state.assistant, req).await;
    (status, Json(body))
}

pub async fn lookup_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<LookupRequest>,
) -> impl IntoResponse {
    let (status, body) = lookup_inner(&state.assistant, req).await;
    (status, Json(body))
}

/// Convert a router `MedbotResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: MedbotResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

/// Router errors at this layer come from request validation, so they map to 400.
fn into_http(response: MedbotResponse) -> (StatusCode, serde_json::Value) {
    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => bad_request(e),
    }
}
