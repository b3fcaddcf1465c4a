//! In-process rows evaluated with the same query semantics as the hosted
//! store. Backs offline runs and tests.

use dashmap::{DashMap, DashSet};
use serde_json::Value;

use super::{DataStore, Query};
use crate::error::{AppError, StoreErrorCode};

#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Value>>,
    failing: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, rows: Vec<Value>) -> Self {
        self.insert(table, rows);
        self
    }

    /// Appends rows to a table, creating it if needed.
    pub fn insert(&self, table: &str, rows: Vec<Value>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Makes every read of `table` fail as if the store were down.
    pub fn fail_table(&self, table: &str) {
        self.failing.insert(table.to_string());
    }
}

#[async_trait::async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        let table = query.table_name();
        if self.failing.contains(table) {
            return Err(AppError::StoreService {
                code: StoreErrorCode::Unavailable,
                message: format!("table '{}' is unavailable", table),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        Ok(self
            .tables
            .get(table)
            .map(|rows| query.apply(&rows))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn missing_tables_read_as_empty() {
        let store = MemoryStore::new();
        assert!(store.select(&Query::table("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn select_one_takes_the_first_ordered_row() {
        let store = MemoryStore::new().with_table(
            "daily_news",
            vec![json!({"date": "2024-01-01"}), json!({"date": "2024-01-03"})],
        );
        let latest = store
            .select_one(&Query::table("daily_news").order("date", Direction::Desc))
            .await
            .unwrap();
        assert_eq!(latest, Some(json!({"date": "2024-01-03"})));
    }

    #[tokio::test]
    async fn failing_tables_error() {
        let store = MemoryStore::new();
        store.fail_table("daily_news");
        let err = store.select(&Query::table("daily_news")).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
