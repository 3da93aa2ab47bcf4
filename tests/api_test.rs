//! HTTP API tests driven through the router with `oneshot`

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::*;
use serde_json::{json, Value};
use swap_feed::api::{create_router, AppState};
use swap_feed::FeedService;
use tower::ServiceExt;

async fn app() -> (Router, Arc<AppState>, Arc<MockState>) {
    let (mock, base_url) = spawn_upstream().await;
    let service = FeedService::new(fast_config(&base_url)).unwrap();
    let state = Arc::new(AppState::new(service));
    (create_router(state.clone()), state, mock)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "10.1.2.3");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn create_body() -> Value {
    json!({
        "chain": "eth",
        "tokenAddress": TOKEN,
        "quoteSymbol": "WETH",
        "pairAddress": POOL,
        "priceUsd": 0.0,
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _state, _mock) = app().await;

    for uri in ["/health", "/v1/health"] {
        let (status, body) = call(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["activeFeeds"], 0);
        assert!(body["latencyMs"].is_number());
    }
}

#[tokio::test]
async fn test_create_feed_validates_input() {
    let (app, state, _mock) = app().await;

    let mut body = create_body();
    body["tokenAddress"] = json!("0x1234");
    let (status, json) = call(&app, "POST", "/v1/feeds", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "API_BAD_REQUEST");

    let mut body = create_body();
    body["chain"] = json!("dogechain");
    let (status, _) = call(&app, "POST", "/v1/feeds", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = create_body();
    body["priceUsd"] = json!(-1.0);
    let (status, _) = call(&app, "POST", "/v1/feeds", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.feeds.is_empty());
}

#[tokio::test]
async fn test_feed_lifecycle() {
    let (app, state, mock) = app().await;
    mock.set(
        TOKEN_PATH,
        Behavior::Data(vec![raw_swap(1, T0, "buy"), raw_swap(2, T0 + 60_000, "sell")]),
    );
    mock.set(POOL_PATH, Behavior::Data(vec![raw_swap(3, T0 + 120_000, "buy")]));

    let (status, body) = call(&app, "POST", "/v1/feeds", Some(create_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chain"], "ethereum");
    assert_eq!(body["data"]["quoteIsStable"], false);
    let feed_id = body["data"]["feedId"].as_str().unwrap().to_string();
    assert_eq!(state.feeds.len(), 1);

    // Poll the API until the merged window shows up
    let uri = format!("/v1/feeds/{}", feed_id);
    let mut feed = Value::Null;
    for _ in 0..40 {
        let (status, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        if body["data"]["transactions"].as_array().map_or(0, |t| t.len()) == 3 {
            feed = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let transactions = feed["data"]["transactions"].as_array().expect("window populated");
    assert_eq!(transactions[0]["hash"], hash_of(3));
    assert_eq!(transactions[0]["type"], "buy");
    assert_eq!(transactions[0]["isNew"], true);
    assert_eq!(transactions[1]["isNew"], false);
    assert_eq!(transactions[0]["priceUsd"], 10.0);
    assert_eq!(feed["data"]["active"], true);
    assert_eq!(feed["data"]["status"]["seeded"], true);
    assert_eq!(feed["data"]["status"]["poolAddress"], POOL);

    let (status, body) = call(
        &app,
        "PUT",
        &format!("{}/price", uri),
        Some(json!({"priceUsd": 1.25})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priceUsd"], 1.25);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("{}/price", uri),
        Some(json!({"priceUsd": -3.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        &format!("{}/visibility", uri),
        Some(json!({"visible": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["visible"], false);

    let (status, body) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);
    assert!(state.feeds.is_empty());

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "API_NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_and_malformed_feed_ids() {
    let (app, _state, _mock) = app().await;

    let (status, body) = call(&app, "GET", "/v1/feeds/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "API_BAD_REQUEST");

    let missing = format!("/v1/feeds/{}", uuid::Uuid::new_v4());
    let (status, _) = call(&app, "DELETE", &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feed_limit() {
    let (mock, base_url) = spawn_upstream().await;
    mock.set(TOKEN_PATH, Behavior::Empty);
    let service = FeedService::new(fast_config(&base_url)).unwrap();
    let state = Arc::new(AppState::new(service).with_max_feeds(1));
    let app = create_router(state.clone());

    let (status, _) = call(&app, "POST", "/v1/feeds", Some(create_body())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/v1/feeds", Some(create_body())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "API_RATE_LIMITED");

    state.stop_all();
    assert!(state.feeds.is_empty());
}
