// tests/api_routes.rs
//! Dashboard API routes driven through the router against in-memory rows.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use marketdesk::store::tables;
use marketdesk::{router, AppError, AppState, DataStore, MemoryStore, Query, QuoteClient, StoreErrorCode};

const SECRET: &str = "s3cret";

fn fixture(name: &str) -> Vec<Value> {
    let raw = match name {
        "earnings_calendar" => include_str!("fixtures/earnings_calendar.json"),
        "correlation_series" => include_str!("fixtures/correlation_series.json"),
        "daily_news" => include_str!("fixtures/daily_news.json"),
        "credit_balance" => include_str!("fixtures/credit_balance.json"),
        other => panic!("no fixture named {other}"),
    };
    serde_json::from_str(raw).unwrap()
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_table(tables::EARNINGS, fixture("earnings_calendar"))
        .with_table(tables::CORRELATION, fixture("correlation_series"))
        .with_table(tables::DAILY_NEWS, fixture("daily_news"))
        .with_table(tables::CREDIT_BALANCE, fixture("credit_balance"))
        .with_table(
            tables::CREDIT_ANALYSIS,
            vec![
                json!({"date": "2024-01-04", "summary": "rising"}),
                json!({"date": "2024-01-05", "summary": "cooling"}),
            ],
        )
}

fn state(store: MemoryStore) -> AppState {
    AppState::new(Arc::new(store), QuoteClient::default())
        .with_revalidate_secret(Some(SECRET.to_string()))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let cache_control = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cache_control, body)
}

fn dates(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|row| row["date"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn earnings_range_is_inclusive_and_ascending() {
    let app = router(state(seeded_store()));
    let (status, cache_control, body) =
        send(&app, "GET", "/api/earnings?start=2024-01-01&end=2024-01-31").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        cache_control.as_deref(),
        Some("public, s-maxage=60, stale-while-revalidate=30")
    );
    assert_eq!(
        dates(&body),
        vec!["2024-01-01", "2024-01-12", "2024-01-25", "2024-01-31", "2024-01-31"]
    );
}

#[tokio::test]
async fn earnings_search_matches_company_or_symbol() {
    let app = router(state(seeded_store()));

    let (_, _, by_company) = send(&app, "GET", "/api/earnings?q=samsung").await;
    assert_eq!(by_company.as_array().unwrap().len(), 2);

    let (_, _, by_symbol) = send(&app, "GET", "/api/earnings?q=msft").await;
    assert_eq!(by_symbol[0]["company"], "Microsoft");
}

#[tokio::test]
async fn invalid_dates_are_rejected() {
    let app = router(state(seeded_store()));

    let (status, _, body) = send(&app, "GET", "/api/earnings?start=2024-13-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, "GET", "/api/news/yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn correlation_serves_only_its_series() {
    let app = router(state(seeded_store()));
    let (status, _, body) = send(&app, "GET", "/api/correlation").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates(&body), vec!["2024-01-02", "2024-01-03", "2024-01-04"]);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["series_type"] == "KOSPI_SP500_20D"));
}

#[tokio::test]
async fn credit_balance_keeps_the_latest_rows_in_order() {
    let app = router(state(seeded_store()));
    let (_, _, body) = send(&app, "GET", "/api/credit-balance?limit=2").await;

    assert_eq!(dates(&body["history"]), vec!["2024-01-04", "2024-01-05"]);
    assert_eq!(body["analysis"]["summary"], "cooling");
}

#[tokio::test]
async fn credit_balance_without_analysis_is_null() {
    let store = MemoryStore::new().with_table(tables::CREDIT_BALANCE, fixture("credit_balance"));
    let app = router(state(store));
    let (_, _, body) = send(&app, "GET", "/api/credit-balance").await;

    assert_eq!(body["history"].as_array().unwrap().len(), 4);
    assert_eq!(body["analysis"], Value::Null);
}

#[tokio::test]
async fn news_listing_latest_and_by_date() {
    let app = router(state(seeded_store()));

    let (_, _, listing) = send(&app, "GET", "/api/news?limit=2").await;
    assert_eq!(dates(&listing), vec!["2024-01-04", "2024-01-03"]);

    let (_, _, latest) = send(&app, "GET", "/api/news/latest").await;
    assert_eq!(latest["title"], "Chip stocks rally");

    let (status, _, by_date) = send(&app, "GET", "/api/news/2024-01-02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_date["title"], "Markets open the year cautiously");
}

#[tokio::test]
async fn missing_news_is_404() {
    let app = router(state(MemoryStore::new()));

    let (status, _, body) = send(&app, "GET", "/api/news/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, "GET", "/api/news/2024-01-09").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failures_are_500_with_an_error_body() {
    let store = seeded_store();
    store.fail_table(tables::HOLIDAYS);
    let app = router(state(store));

    let (status, _, body) = send(&app, "GET", "/api/holidays?year=2024").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

/// A hosted store that reports every relation as missing.
struct MissingRelations;

#[async_trait::async_trait]
impl DataStore for MissingRelations {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        Err(AppError::StoreService {
            code: StoreErrorCode::from_http_status(404),
            message: format!("relation \"public.{}\" does not exist", query.table_name()),
            status: StatusCode::NOT_FOUND,
        })
    }
}

#[tokio::test]
async fn store_not_found_is_500_not_404() {
    let app = router(AppState::new(Arc::new(MissingRelations), QuoteClient::default()));

    for uri in ["/api/correlation", "/api/earnings", "/api/news"] {
        let (status, _, body) = send(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("does not exist"));
    }
}

#[tokio::test]
async fn prices_require_symbols() {
    let app = router(state(seeded_store()));
    let (status, _, body) = send(&app, "GET", "/api/prices?symbols=%20,%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrong_secret_is_rejected_without_side_effects() {
    let app_state = state(seeded_store());
    let app = router(app_state.clone());

    send(&app, "GET", "/api/news").await;
    assert_eq!(app_state.cache.len(), 1);

    let (status, _, body) = send(&app, "POST", "/api/revalidate?secret=nope&tag=news").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
    assert_eq!(app_state.cache.len(), 1);
}

#[tokio::test]
async fn unconfigured_secret_rejects_everything() {
    let app_state = AppState::new(Arc::new(seeded_store()), QuoteClient::default());
    let app = router(app_state);
    let (status, _, _) = send(&app, "POST", "/api/revalidate?secret=&tag=news").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revalidation_serves_fresh_rows() {
    let store = Arc::new(seeded_store());
    let app_state = AppState::new(store.clone(), QuoteClient::default())
        .with_revalidate_secret(Some(SECRET.to_string()));
    let app = router(app_state.clone());

    let (_, _, before) = send(&app, "GET", "/api/news/latest").await;
    assert_eq!(before["date"], "2024-01-04");

    store.insert(
        tables::DAILY_NEWS,
        vec![json!({"date": "2024-01-05", "title": "Fresh", "headlines": []})],
    );
    let (_, _, cached) = send(&app, "GET", "/api/news/latest").await;
    assert_eq!(cached["date"], "2024-01-04");

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/api/revalidate?secret={SECRET}&tag=news"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], true);
    assert_eq!(body["tags"], json!(["news"]));
    assert!(body["now"].is_i64());

    let (_, _, after) = send(&app, "GET", "/api/news/latest").await;
    assert_eq!(after["date"], "2024-01-05");
}

#[tokio::test]
async fn revalidation_by_path_prefix() {
    let app_state = state(seeded_store());
    let app = router(app_state.clone());

    send(&app, "GET", "/api/earnings?q=samsung").await;
    send(&app, "GET", "/api/correlation").await;
    assert_eq!(app_state.cache.len(), 2);

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/api/revalidate?secret={SECRET}&path=/api/earnings"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paths"], json!(["/api/earnings"]));
    assert_eq!(app_state.cache.len(), 1);
}
