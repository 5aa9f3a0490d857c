//! HTTP integration tests for the MedBot REST API
//!
//! Full handler dispatch through the Axum router with `oneshot`. Providers are
//! the offline hashing embedder and a canned generator, so no network is used.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use medbot_core::generation::GenerationBackend;
use medbot_core::{Corpus, EntityKind, HashingEmbeddingClient, MedbotConfig, ProviderError, Record};
use medbot_server::http::{build_router, HttpState};
use medbot_server::Assistant;
use serde_json::json;
use tower::ServiceExt;

struct CannedGenerator;

#[async_trait]
impl GenerationBackend for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        Ok(format!("Canned answer ({} prompt chars)", prompt.len()))
    }

    fn name(&self) -> &str {
        "canned"
    }
}

async fn make_state() -> Arc<HttpState> {
    let corpus = Corpus::from_records(vec![
        Record::new(EntityKind::Drug, "Amoxicillin", "drug_database")
            .with_field("class", "Penicillin antibiotic")
            .with_field("uses", "bacterial infections"),
        Record::new(EntityKind::Condition, "Hypertension", "common_conditions")
            .with_field("description", "Persistently high blood pressure"),
        Record::new(EntityKind::Solution, "Burn care", "emergency_procedure")
            .with_field("steps", "Cool the burn under running water for 20 minutes"),
    ]);
    let assistant = Assistant::from_corpus(
        MedbotConfig::default(),
        corpus,
        Arc::new(HashingEmbeddingClient::default()),
        Arc::new(CannedGenerator),
    )
    .await;
    Arc::new(HttpState {
        assistant: Arc::new(assistant),
    })
}

async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let app = build_router(make_state().await);
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["records"], 3);
    assert_eq!(json["indexed"], 3);
    assert_eq!(json["generation_backend"], "canned");
    assert!(json["format_tag"].as_str().unwrap().len() == 16);
}

#[tokio::test]
async fn test_version_endpoint() {
    let (status, json) = send(get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["version"].is_string());
    assert_eq!(json["protocol"], "medbot/1");
}

#[tokio::test]
async fn test_topics_endpoint() {
    let (status, json) = send(get("/topics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert!(json["topics"]
        .as_array()
        .unwrap()
        .contains(&json!("solution/emergency_procedure")));
}

#[tokio::test]
async fn test_classify_endpoint() {
    let (status, json) = send(post("/classify", json!({"query": "ibuprofen dosage"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "medication");

    let (status, json) = send(post("/classify", json!({"query": "call an ambulance"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "emergency");
}

#[tokio::test]
async fn test_classify_missing_query_is_bad_request() {
    let (status, json) = send(post("/classify", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn test_ask_smart_medication_roundtrip() {
    let (status, json) = send(post(
        "/ask",
        json!({"query": "tell me about amoxicillin side effects"}),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "medication");
    assert_eq!(json["source"], "database");
    assert_eq!(json["matches"][0]["name"], "Amoxicillin");
    assert!(json["text"]
        .as_str()
        .unwrap()
        .ends_with("📚 *Information sourced from medical database*"));
    assert!(json["took_ms"].is_number());
}

#[tokio::test]
async fn test_ask_condition_mode() {
    let (status, json) = send(post(
        "/ask",
        json!({"query": "hypertension", "mode": "condition"}),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "condition");
    assert_eq!(json["matches"][0]["kind"], "condition");
}

#[tokio::test]
async fn test_ask_general_reports_ranked_matches() {
    let (status, json) = send(post("/ask", json!({"query": "how to cool a burn"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "general");
    let matches = json["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 3);
    let scores: Vec<f64> = matches.iter().map(|m| m["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_ask_empty_query_is_bad_request() {
    let (status, _) = send(post("/ask", json!({"query": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_endpoint() {
    let (status, json) = send(post("/lookup", json!({"kind": "drug", "name": "amox"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["found"], true);
    assert_eq!(json["record"]["source"], "drug_database");

    let (status, json) = send(post("/lookup", json!({"kind": "drug", "name": "insulin"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["found"], false);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = build_router(make_state().await);
    let resp = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
