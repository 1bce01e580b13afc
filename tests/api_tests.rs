use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use storefront_recs::{
    config::CascadeConfig,
    db::{memory::CatalogEntry, InMemoryStore},
    routes::{create_router, AppState},
    services::RecommendationEngine,
};

fn create_test_server(store: Arc<InMemoryStore>) -> TestServer {
    let engine = RecommendationEngine::new(
        CascadeConfig::default(),
        store.clone(),
        store.clone(),
        store,
    );
    let app = create_router(Arc::new(AppState::new(Arc::new(engine))));
    TestServer::new(app).unwrap()
}

async fn seeded_store(count: usize) -> (Arc<InMemoryStore>, Vec<Uuid>) {
    let store = Arc::new(InMemoryStore::new());
    let category = Uuid::new_v4();
    let mut ids = Vec::new();
    for i in 0..count {
        ids.push(
            store
                .insert_product(CatalogEntry::new(&format!("Product {}", i), category))
                .await,
        );
    }
    (store, ids)
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(Arc::new(InMemoryStore::new()));
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_get_anonymous_recommendations() {
    let (store, _) = seeded_store(4).await;
    let server = create_test_server(store);

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["source"], "platform_defaults");
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert!(body.get("metadata").is_none());
}

#[tokio::test]
async fn test_get_honours_exclude_list() {
    let (store, ids) = seeded_store(3).await;
    let server = create_test_server(store);

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("exclude", format!("{},{}", ids[0], ids[1]))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], ids[2].to_string());
}

#[tokio::test]
async fn test_post_with_user_and_wishlist() {
    let (store, ids) = seeded_store(5).await;
    let user = Uuid::new_v4();
    store.add_to_wishlist(user, ids[0], Utc::now()).await;
    let server = create_test_server(store);

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "user_id": user,
            "limit": 10,
            "exclude_product_ids": [ids[1]]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["source"], "wishlist");

    let returned: Vec<String> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(returned.len(), 3);
    assert!(!returned.contains(&ids[0].to_string()));
    assert!(!returned.contains(&ids[1].to_string()));
    assert!(body["metadata"]["category_id"].is_string());
}

#[tokio::test]
async fn test_negative_limit_is_bad_request() {
    let server = create_test_server(Arc::new(InMemoryStore::new()));

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("limit", -3)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn test_malformed_user_id_is_bad_request() {
    let server = create_test_server(Arc::new(InMemoryStore::new()));

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("user_id", "not-a-uuid")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "user_id": "not-a-uuid" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_request_id_echoed() {
    let server = create_test_server(Arc::new(InMemoryStore::new()));

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-123"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), "trace-123");
}

#[tokio::test]
async fn test_request_id_generated_when_missing() {
    let server = create_test_server(Arc::new(InMemoryStore::new()));

    let response = server.get("/health").await;

    let header = response.header("x-request-id");
    assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
}
