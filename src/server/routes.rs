//! Route handlers for the dashboard API.
//!
//! Handlers only translate between HTTP and store queries. Reads that are
//! safe to share go through the route cache and carry the public
//! Cache-Control header.

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use subtle::ConstantTimeEq;

use super::AppState;
use crate::constants::{CORRELATION_SERIES, NEWS_DEFAULT_LIMIT, NEWS_MAX_LIMIT, PUBLIC_CACHE_CONTROL};
use crate::error::AppError;
use crate::quotes::split_symbols;
use crate::store::{tables, Direction, Query};
use crate::types::TradingDate;

/// Route tags used for cache entries and revalidation.
pub mod tags {
    pub const CORRELATION: &str = "correlation";
    pub const CREDIT_BALANCE: &str = "credit-balance";
    pub const EARNINGS: &str = "earnings";
    pub const HOLIDAYS: &str = "holidays";
    pub const NEWS: &str = "news";

    pub const ALL: [&str; 5] = [CORRELATION, CREDIT_BALANCE, EARNINGS, HOLIDAYS, NEWS];
}

/// Error answer of every route: `{ "error": message }` with a mapped status.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        } else {
            log::debug!("Request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type RouteResult = Result<Response, ApiError>;

fn public_json(body: Value) -> Response {
    ([(header::CACHE_CONTROL, PUBLIC_CACHE_CONTROL)], Json(body)).into_response()
}

/// Serves from the route cache, or loads, stores, and serves.
async fn cached<F>(state: &AppState, uri: &Uri, tag: &'static str, load: F) -> RouteResult
where
    F: Future<Output = Result<Value, AppError>>,
{
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    if let Some(body) = state.cache.get(&key) {
        log::debug!("Route cache hit for {}", key);
        return Ok(public_json(body));
    }

    let body = load.await?;
    state.cache.insert(key, tag, body.clone());
    Ok(public_json(body))
}

fn parse_date(input: &str) -> Result<String, AppError> {
    Ok(TradingDate::parse(input)?.iso())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn correlation(State(state): State<AppState>, uri: Uri) -> RouteResult {
    cached(&state, &uri, tags::CORRELATION, async {
        let query = Query::table(tables::CORRELATION)
            .eq("series_type", CORRELATION_SERIES)
            .order("date", Direction::Asc);
        Ok(Value::Array(state.store.select(&query).await?))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct CreditBalanceParams {
    limit: Option<String>,
}

pub async fn credit_balance(
    State(state): State<AppState>,
    uri: Uri,
    QueryParams(params): QueryParams<CreditBalanceParams>,
) -> RouteResult {
    let limit = non_blank(&params.limit)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| AppError::InvalidRequest(format!("invalid limit '{}'", raw)))
        })
        .transpose()?;

    cached(&state, &uri, tags::CREDIT_BALANCE, async {
        let history = match limit {
            // Latest n rows, still served oldest first.
            Some(n) => {
                let query = Query::table(tables::CREDIT_BALANCE)
                    .order("date", Direction::Desc)
                    .limit(n);
                let mut rows = state.store.select(&query).await?;
                rows.reverse();
                rows
            }
            None => {
                let query = Query::table(tables::CREDIT_BALANCE).order("date", Direction::Asc);
                state.store.select(&query).await?
            }
        };

        let analysis = state
            .store
            .select_one(&Query::table(tables::CREDIT_ANALYSIS).order("date", Direction::Desc))
            .await?;

        Ok(json!({ "history": history, "analysis": analysis }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct EarningsParams {
    start: Option<String>,
    end: Option<String>,
    q: Option<String>,
}

pub async fn earnings(
    State(state): State<AppState>,
    uri: Uri,
    QueryParams(params): QueryParams<EarningsParams>,
) -> RouteResult {
    let start = non_blank(&params.start).map(parse_date).transpose()?;
    let end = non_blank(&params.end).map(parse_date).transpose()?;

    cached(&state, &uri, tags::EARNINGS, async {
        let mut query = Query::table(tables::EARNINGS);
        if let Some(start) = start {
            query = query.gte("date", start);
        }
        if let Some(end) = end {
            query = query.lte("date", end);
        }
        if let Some(needle) = non_blank(&params.q) {
            query = query.search(&["company", "symbol"], needle);
        }
        let query = query.order("date", Direction::Asc);
        Ok(Value::Array(state.store.select(&query).await?))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct HolidayParams {
    year: Option<String>,
}

pub async fn holidays(
    State(state): State<AppState>,
    uri: Uri,
    QueryParams(params): QueryParams<HolidayParams>,
) -> RouteResult {
    let year = non_blank(&params.year)
        .map(|raw| {
            raw.parse::<u16>()
                .map_err(|_| AppError::InvalidRequest(format!("invalid year '{}'", raw)))
        })
        .transpose()?;

    cached(&state, &uri, tags::HOLIDAYS, async {
        let mut query = Query::table(tables::HOLIDAYS);
        if let Some(year) = year {
            query = query
                .gte("date", format!("{:04}-01-01", year))
                .lte("date", format!("{:04}-12-31", year));
        }
        let query = query.order("date", Direction::Asc);
        Ok(Value::Array(state.store.select(&query).await?))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    limit: Option<String>,
}

pub async fn news(
    State(state): State<AppState>,
    uri: Uri,
    QueryParams(params): QueryParams<NewsParams>,
) -> RouteResult {
    let limit = match non_blank(&params.limit) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::InvalidRequest(format!("invalid limit '{}'", raw)))?
            .clamp(1, NEWS_MAX_LIMIT),
        None => NEWS_DEFAULT_LIMIT,
    };

    cached(&state, &uri, tags::NEWS, async {
        let query = Query::table(tables::DAILY_NEWS)
            .order("date", Direction::Desc)
            .limit(limit);
        Ok(Value::Array(state.store.select(&query).await?))
    })
    .await
}

pub async fn latest_news(State(state): State<AppState>, uri: Uri) -> RouteResult {
    cached(&state, &uri, tags::NEWS, async {
        let query = Query::table(tables::DAILY_NEWS).order("date", Direction::Desc);
        state
            .store
            .select_one(&query)
            .await?
            .ok_or_else(|| AppError::NotFound("no news has been published yet".to_string()))
    })
    .await
}

pub async fn news_by_date(
    State(state): State<AppState>,
    uri: Uri,
    Path(date): Path<String>,
) -> RouteResult {
    let date = parse_date(&date)?;

    cached(&state, &uri, tags::NEWS, async {
        let query = Query::table(tables::DAILY_NEWS).eq("date", date.as_str());
        state
            .store
            .select_one(&query)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no news for {}", date)))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    symbols: Option<String>,
}

pub async fn prices(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PriceParams>,
) -> RouteResult {
    let symbols = params
        .symbols
        .as_deref()
        .map(split_symbols)
        .unwrap_or_default();
    if symbols.is_empty() {
        return Err(AppError::InvalidRequest("symbols query parameter is required".into()).into());
    }

    let results = state.quotes.fetch_all(&symbols).await;
    Ok(Json(results).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RevalidateParams {
    secret: Option<String>,
    tag: Option<String>,
    path: Option<String>,
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compares in constant time; an unset or empty secret matches nothing.
fn secret_matches(expected: Option<&str>, given: Option<&str>) -> bool {
    match (expected, given) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
        }
        _ => false,
    }
}

/// Invalidates cached routes. Without a tag or path every route tag is
/// revalidated.
pub async fn revalidate(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<RevalidateParams>,
) -> Response {
    if !secret_matches(state.revalidate_secret.as_deref(), params.secret.as_deref()) {
        log::warn!("Rejected revalidation request with an invalid secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid secret" })),
        )
            .into_response();
    }

    let mut tags = split_list(&params.tag);
    let paths = split_list(&params.path);
    if tags.is_empty() && paths.is_empty() {
        tags = tags::ALL.iter().map(|t| t.to_string()).collect();
    }

    let removed: usize = tags
        .iter()
        .map(|tag| state.cache.invalidate_tag(tag))
        .chain(paths.iter().map(|path| state.cache.invalidate_path(path)))
        .sum();
    log::info!(
        "Revalidated tags {:?} and paths {:?} ({} cached bodies dropped)",
        tags,
        paths,
        removed
    );

    Json(json!({
        "revalidated": true,
        "tags": tags,
        "paths": paths,
        "now": chrono::Utc::now().timestamp_millis(),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_must_match_exactly() {
        assert!(secret_matches(Some("s3cret"), Some("s3cret")));
        assert!(!secret_matches(Some("s3cret"), Some("s3cre")));
        assert!(!secret_matches(Some("s3cret"), Some("s3cret!")));
        assert!(!secret_matches(Some("s3cret"), None));
        assert!(!secret_matches(Some(""), Some("")));
        assert!(!secret_matches(None, Some("s3cret")));
    }
}
