//! Price lookup through a public relay in front of the quote provider.
//!
//! Every symbol is fetched concurrently and fails on its own: a slow or
//! broken symbol turns into an `{ "error": .. }` entry while the rest of
//! the batch still answers.

use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::form_urlencoded::byte_serialize;

use crate::constants::{
    DEFAULT_QUOTE_PROVIDER, DEFAULT_QUOTE_RELAY, QUOTE_MAX_SYMBOLS, QUOTE_TIMEOUT,
};
use crate::error::AppError;
use crate::types::Symbol;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub change_percent: Option<f64>,
    pub currency: Option<String>,
}

/// Outcome for one symbol of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuoteLookup {
    Ok(Quote),
    Err { error: String },
}

impl QuoteLookup {
    fn failed(message: impl Into<String>) -> Self {
        Self::Err {
            error: message.into(),
        }
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Ok(quote) => Some(quote),
            Self::Err { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct QuoteClient {
    client: Client,
    relay: String,
    provider: String,
    timeout: Duration,
}

impl Default for QuoteClient {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_RELAY, DEFAULT_QUOTE_PROVIDER)
    }
}

impl QuoteClient {
    /// `relay` carries a `{url}` placeholder, `provider` a `{symbol}` one.
    pub fn new(relay: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            relay: relay.into(),
            provider: provider.into(),
            timeout: QUOTE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The URL actually requested for a symbol.
    pub fn request_url(&self, symbol: &Symbol) -> String {
        let provider = self
            .provider
            .replace("{symbol}", &encode(symbol.as_str()));
        if self.relay.contains("{url}") {
            self.relay.replace("{url}", &encode(&provider))
        } else {
            provider
        }
    }

    /// Looks up every symbol concurrently, keyed in request order.
    pub async fn fetch_all<S: AsRef<str>>(&self, symbols: &[S]) -> IndexMap<String, QuoteLookup> {
        let requested = normalize_symbols(symbols);

        let lookups = requested.iter().map(|raw| async move {
            let lookup = match Symbol::parse(raw) {
                Ok(symbol) => self.fetch_one(&symbol).await,
                Err(e) => QuoteLookup::failed(e.to_string()),
            };
            (raw.clone(), lookup)
        });

        join_all(lookups).await.into_iter().collect()
    }

    async fn fetch_one(&self, symbol: &Symbol) -> QuoteLookup {
        match tokio::time::timeout(self.timeout, self.fetch_quote(symbol)).await {
            Ok(Ok(quote)) => QuoteLookup::Ok(quote),
            Ok(Err(e)) => {
                log::warn!("Quote lookup for {} failed: {}", symbol, e);
                QuoteLookup::failed(e.to_string())
            }
            Err(_) => {
                log::warn!("Quote lookup for {} timed out", symbol);
                QuoteLookup::failed(format!("timed out after {}s", self.timeout.as_secs_f32()))
            }
        }
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, AppError> {
        let response = self.client.get(self.request_url(symbol)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::MalformedResponse(format!(
                "quote provider answered HTTP {}",
                status.as_u16()
            )));
        }
        let body: Value = response.json().await?;
        parse_chart(symbol, &body)
    }
}

/// Trims, drops empties, de-duplicates, and caps the batch size.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    symbols
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .take(QUOTE_MAX_SYMBOLS)
        .collect()
}

/// Splits a comma-separated `symbols` parameter.
pub fn split_symbols(param: &str) -> Vec<String> {
    normalize_symbols(&param.split(',').collect::<Vec<_>>())
}

/// Reads the quote out of a chart payload's first result.
fn parse_chart(symbol: &Symbol, body: &Value) -> Result<Quote, AppError> {
    let meta = body
        .pointer("/chart/result/0/meta")
        .ok_or_else(|| AppError::MalformedResponse("missing chart metadata".to_string()))?;

    let price = meta
        .get("regularMarketPrice")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::MalformedResponse("missing market price".to_string()))?;
    let previous_close = meta
        .get("chartPreviousClose")
        .or_else(|| meta.get("previousClose"))
        .and_then(Value::as_f64);
    let change_percent = previous_close
        .filter(|prev| *prev != 0.0)
        .map(|prev| (price - prev) / prev * 100.0);

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        previous_close,
        change_percent,
        currency: meta
            .get("currency")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn encode(input: &str) -> String {
    byte_serialize(input.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn spawn_provider() -> String {
        async fn chart(Path(symbol): Path<String>) -> Result<Json<Value>, StatusCode> {
            match symbol.as_str() {
                "AAPL" => Ok(Json(json!({"chart": {"result": [{"meta": {
                    "regularMarketPrice": 110.0,
                    "chartPreviousClose": 100.0,
                    "currency": "USD"
                }}]}}))),
                "SLOW" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Json(json!({})))
                }
                "BROKEN" => Ok(Json(json!({"chart": {"result": []}}))),
                _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
            }
        }

        let app = Router::new().route("/chart/:symbol", get(chart));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/chart/{{symbol}}", addr)
    }

    #[test]
    fn normalizes_symbol_lists() {
        assert_eq!(
            split_symbols(" AAPL, ,MSFT,AAPL,"),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        let many: Vec<String> = (0..30).map(|i| format!("S{i}")).collect();
        assert_eq!(normalize_symbols(&many).len(), QUOTE_MAX_SYMBOLS);
    }

    #[test]
    fn relay_receives_encoded_provider_url() {
        let client = QuoteClient::new(
            "https://relay.test/?url={url}",
            "https://provider.test/chart/{symbol}?range=5d",
        );
        let url = client.request_url(&Symbol::parse("^KS11").unwrap());
        assert_eq!(
            url,
            "https://relay.test/?url=https%3A%2F%2Fprovider.test%2Fchart%2F%255EKS11%3Frange%3D5d"
        );
    }

    #[test]
    fn change_percent_comes_from_previous_close() {
        let symbol = Symbol::parse("AAPL").unwrap();
        let quote = parse_chart(
            &symbol,
            &json!({"chart": {"result": [{"meta": {"regularMarketPrice": 90.0, "previousClose": 100.0}}]}}),
        )
        .unwrap();
        assert_eq!(quote.change_percent, Some(-10.0));
        assert_eq!(quote.currency, None);
    }

    #[tokio::test]
    async fn failures_stay_with_their_symbol() {
        let provider = spawn_provider().await;
        let client = QuoteClient::new("", provider).with_timeout(Duration::from_millis(500));

        let results = client
            .fetch_all(&["AAPL", "SLOW", "DOWN", "BROKEN"])
            .await;

        let keys: Vec<_> = results.keys().cloned().collect();
        assert_eq!(keys, vec!["AAPL", "SLOW", "DOWN", "BROKEN"]);

        let apple = results["AAPL"].quote().unwrap();
        assert_eq!(apple.price, 110.0);
        assert_eq!(apple.change_percent, Some(10.0));
        assert_eq!(apple.currency.as_deref(), Some("USD"));

        for failed in ["SLOW", "DOWN", "BROKEN"] {
            assert!(
                matches!(results[failed], QuoteLookup::Err { .. }),
                "{failed} should fail"
            );
        }
    }

    #[test]
    fn lookups_serialize_as_quote_or_error() {
        let ok = QuoteLookup::Ok(Quote {
            symbol: "AAPL".into(),
            price: 1.0,
            previous_close: None,
            change_percent: None,
            currency: None,
        });
        assert_eq!(serde_json::to_value(&ok).unwrap()["price"], json!(1.0));
        let err = QuoteLookup::failed("timed out");
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "timed out"}));
    }
}
