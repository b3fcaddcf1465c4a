//! HTTP client for the hosted data store's REST interface.
//!
//! A thin wrapper around reqwest: authentication headers, query rendering,
//! and status classification. No business logic lives here.

use reqwest::{header, Client, Response};
use serde_json::Value;
use std::time::Duration;

use super::{DataStore, Query};
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, StoreErrorCode};
use crate::error_recovery::retry_with_backoff;
use crate::types::{StoreKey, ValidatedUrl};

const REST_PATH: &str = "rest/v1";
const MAX_ATTEMPTS: u32 = 3;

/// Hosted data store reached over its REST interface.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: ValidatedUrl,
}

impl RestStore {
    /// Creates a client authenticated with the store's service key.
    pub fn new(base_url: ValidatedUrl, key: &StoreKey) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(key)?)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn create_headers(key: &StoreKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();
        let invalid = |e: header::InvalidHeaderValue| {
            AppError::MissingConfiguration(format!("Invalid store key format: {}", e))
        };

        headers.insert(
            "apikey",
            header::HeaderValue::from_str(key.as_str()).map_err(invalid)?,
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", key.as_str())).map_err(invalid)?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// URL of a table's REST resource.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url.trimmed(), REST_PATH, table)
    }

    async fn get(&self, query: &Query) -> Result<Response, AppError> {
        let url = self.table_url(query.table_name());
        log::debug!("GET {} {:?}", url, query.to_params());
        Ok(self.client.get(url).query(&query.to_params()).send().await?)
    }

    async fn select_once(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        let response = self.get(query).await?;
        let result = extract_response_text(response).await?;
        parse_rows(result)
    }
}

#[async_trait::async_trait]
impl DataStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        retry_with_backoff(
            || self.select_once(query),
            MAX_ATTEMPTS,
            Duration::from_millis(200),
            Duration::from_secs(2),
        )
        .await
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}

/// Turns a store response into rows, classifying error statuses.
pub(crate) fn parse_rows(response: ApiResponse<String>) -> Result<Vec<Value>, AppError> {
    if !response.status.is_success() {
        let message = error_message(&response.data);
        log::error!(
            "Data store answered {} for {}: {}",
            response.status.as_u16(),
            response.url,
            message
        );
        return Err(AppError::StoreService {
            code: StoreErrorCode::from_http_status(response.status.as_u16()),
            message,
            status: response.status,
        });
    }

    match serde_json::from_str::<Value>(&response.data)? {
        Value::Array(rows) => Ok(rows),
        Value::Object(row) => Ok(vec![Value::Object(row)]),
        other => Err(AppError::MalformedResponse(format!(
            "Expected rows from {}, got {}",
            response.url,
            preview(&other.to_string())
        ))),
    }
}

/// Pulls `message` out of a JSON error body, falling back to a body preview.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| preview(body))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn response(status: StatusCode, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status,
            url: "https://store.test/rest/v1/daily_news".to_string(),
        }
    }

    #[test]
    fn parses_row_arrays() {
        let rows = parse_rows(response(StatusCode::OK, r#"[{"date":"2024-01-02"}]"#)).unwrap();
        assert_eq!(rows, vec![json!({"date": "2024-01-02"})]);
    }

    #[test]
    fn error_bodies_become_store_errors() {
        let err = parse_rows(response(
            StatusCode::NOT_FOUND,
            r#"{"code":"42P01","message":"relation does not exist"}"#,
        ))
        .unwrap_err();
        match err {
            AppError::StoreService { code, message, .. } => {
                assert_eq!(code, StoreErrorCode::NotFound);
                assert_eq!(message, "relation does not exist");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scalar_bodies_are_malformed() {
        let err = parse_rows(response(StatusCode::OK, "42")).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn table_urls_join_cleanly() {
        let store = RestStore::new(
            ValidatedUrl::parse("https://project.store.test/").unwrap(),
            &StoreKey::new("service-key-123").unwrap(),
        )
        .unwrap();
        assert_eq!(
            store.table_url("daily_news"),
            "https://project.store.test/rest/v1/daily_news"
        );
    }
}
