// tests/quote_fanout.rs
//! Price lookups through a relay, with an in-test server standing in for
//! both the relay and the quote provider.

use axum::{
    extract::Query,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use marketdesk::{router, AppState, MemoryStore, QuoteClient, QuoteLookup};

/// Serves `/relay?url=...` by dispatching on the symbol at the end of the
/// decoded provider URL.
async fn spawn_relay() -> String {
    async fn relay(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
        let target = params.get("url").ok_or(StatusCode::BAD_REQUEST)?;
        let symbol = target.rsplit('/').next().unwrap_or_default();
        match symbol {
            "%5EKS11" => Ok(Json(json!({"chart": {"result": [{"meta": {
                "regularMarketPrice": 2655.28,
                "chartPreviousClose": 2669.81,
                "currency": "KRW"
            }}]}}))),
            "SPY" => Ok(Json(json!({"chart": {"result": [{"meta": {
                "regularMarketPrice": 476.69,
                "previousClose": 475.0,
                "currency": "USD"
            }}]}}))),
            "HANG" => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Err(StatusCode::GATEWAY_TIMEOUT)
            }
            "GARBAGE" => Ok(Json(json!({"unexpected": true}))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    let app = Router::new().route("/relay", get(relay));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> QuoteClient {
    QuoteClient::new(
        format!("{base}/relay?url={{url}}"),
        "https://provider.invalid/chart/{symbol}",
    )
    .with_timeout(Duration::from_millis(300))
}

#[tokio::test]
async fn one_bad_symbol_does_not_sink_the_batch() {
    let base = spawn_relay().await;
    let results = client(&base)
        .fetch_all(&["^KS11", "HANG", "SPY", "NOPE", "GARBAGE"])
        .await;

    assert_eq!(
        results.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["^KS11", "HANG", "SPY", "NOPE", "GARBAGE"]
    );

    let kospi = results["^KS11"].quote().unwrap();
    assert_eq!(kospi.currency.as_deref(), Some("KRW"));
    assert!(kospi.change_percent.unwrap() < 0.0);

    let spy = results["SPY"].quote().unwrap();
    assert_eq!(spy.previous_close, Some(475.0));

    for failed in ["HANG", "NOPE", "GARBAGE"] {
        assert!(matches!(results[failed], QuoteLookup::Err { .. }));
    }
}

#[tokio::test]
async fn prices_route_returns_the_map_in_request_order() {
    let base = spawn_relay().await;
    let state = AppState::new(Arc::new(MemoryStore::new()), client(&base));

    let response = router(state)
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/prices?symbols=SPY,%5EKS11,SPY,NOPE")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    let spy_at = raw.find("\"SPY\"").unwrap();
    let kospi_at = raw.find("\"^KS11\"").unwrap();
    assert!(spy_at < kospi_at);

    let body: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body.as_object().unwrap().len(), 3);
    assert_eq!(body["SPY"]["price"], json!(476.69));
    assert!(body["NOPE"]["error"].is_string());
}
