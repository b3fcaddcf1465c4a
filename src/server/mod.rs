//! Read-only dashboard API: store proxy routes, the price fan-out, and the
//! revalidation endpoint.

mod cache;
pub mod routes;

pub use cache::TagCache;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::AppError;
use crate::quotes::QuoteClient;
use crate::store::DataStore;

/// Shared handles every route works from.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub quotes: QuoteClient,
    pub cache: Arc<TagCache>,
    pub revalidate_secret: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, quotes: QuoteClient) -> Self {
        Self {
            store,
            quotes,
            cache: Arc::new(TagCache::default()),
            revalidate_secret: None,
        }
    }

    pub fn with_revalidate_secret(mut self, secret: Option<String>) -> Self {
        self.revalidate_secret = secret.filter(|s| !s.is_empty());
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/correlation", get(routes::correlation))
        .route("/api/credit-balance", get(routes::credit_balance))
        .route("/api/earnings", get(routes::earnings))
        .route("/api/holidays", get(routes::holidays))
        .route("/api/news", get(routes::news))
        .route("/api/news/latest", get(routes::latest_news))
        .route("/api/news/:date", get(routes::news_by_date))
        .route("/api/prices", get(routes::prices))
        .route("/api/revalidate", post(routes::revalidate))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    if state.revalidate_secret.is_none() {
        log::warn!("No revalidation secret configured; /api/revalidate will reject every call");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Dashboard API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
