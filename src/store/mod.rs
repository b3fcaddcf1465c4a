//! Hosted data store access: read-only selects against named tables.
//!
//! Route handlers depend on the [`DataStore`] trait, never on HTTP details,
//! so the same handlers run against the hosted store or in-process rows.

mod memory;
mod query;
mod rest;

pub use memory::MemoryStore;
pub use query::{Direction, Filter, Query};
pub use rest::{extract_response_text, ApiResponse, RestStore};

use crate::error::AppError;
use serde_json::Value;

/// Table names the dashboard reads from.
pub mod tables {
    pub const CORRELATION: &str = "correlation_series";
    pub const CREDIT_BALANCE: &str = "credit_balance";
    pub const CREDIT_ANALYSIS: &str = "credit_analysis";
    pub const EARNINGS: &str = "earnings_calendar";
    pub const HOLIDAYS: &str = "market_holidays";
    pub const DAILY_NEWS: &str = "daily_news";
}

/// The ability to read records from the hosted data store.
#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError>;

    /// First matching row, if any.
    async fn select_one(&self, query: &Query) -> Result<Option<Value>, AppError> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }
}
