//! Read-only query builder for the hosted data store.
//!
//! A [`Query`] renders to the store's REST filter dialect and can also be
//! evaluated in process against JSON rows, so the in-memory store answers
//! exactly what the hosted one would.

use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match on any of the columns.
    Search { columns: Vec<String>, needle: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: String,
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.into(), value.into()));
        self
    }

    pub fn lte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.into(), value.into()));
        self
    }

    /// Adds a text search; a needle that is empty after sanitising is ignored.
    pub fn search(mut self, columns: &[&str], needle: &str) -> Self {
        let needle = sanitize_needle(needle);
        if !needle.is_empty() && !columns.is_empty() {
            self.filters.push(Filter::Search {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                needle,
            });
        }
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Query-string parameters in the store's REST dialect.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];

        for filter in &self.filters {
            match filter {
                Filter::Eq(column, value) => {
                    params.push((column.clone(), format!("eq.{}", render_value(value))))
                }
                Filter::Gte(column, value) => {
                    params.push((column.clone(), format!("gte.{}", render_value(value))))
                }
                Filter::Lte(column, value) => {
                    params.push((column.clone(), format!("lte.{}", render_value(value))))
                }
                Filter::Search { columns, needle } => {
                    let clauses: Vec<String> = columns
                        .iter()
                        .map(|column| format!("{}.ilike.*{}*", column, needle))
                        .collect();
                    params.push(("or".to_string(), format!("({})", clauses.join(","))));
                }
            }
        }

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{}.{}", column, direction.as_str()))
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Whether a row passes every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(column, expected) => row
                .get(column)
                .is_some_and(|actual| compare(actual, expected) == Some(Ordering::Equal)),
            Filter::Gte(column, bound) => row.get(column).is_some_and(|actual| {
                matches!(
                    compare(actual, bound),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }),
            Filter::Lte(column, bound) => row.get(column).is_some_and(|actual| {
                matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }),
            Filter::Search { columns, needle } => {
                let needle = needle.to_lowercase();
                columns.iter().any(|column| {
                    row.get(column)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
        })
    }

    /// Evaluates the query over in-memory rows: filter, stable sort, limit,
    /// then project the selected columns.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut selected: Vec<&Value> = rows.iter().filter(|row| self.matches(row)).collect();

        selected.sort_by(|a, b| {
            for (column, direction) in &self.order {
                let ordering = sort_key_cmp(a.get(column), b.get(column));
                let ordering = match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let limit = self.limit.unwrap_or(usize::MAX);
        selected
            .into_iter()
            .take(limit)
            .map(|row| self.project(row))
            .collect()
    }

    fn project(&self, row: &Value) -> Value {
        if self.columns.trim() == "*" {
            return row.clone();
        }
        let Some(object) = row.as_object() else {
            return row.clone();
        };
        let projected = self
            .columns
            .split(',')
            .map(str::trim)
            .filter_map(|column| object.get(column).map(|v| (column.to_string(), v.clone())))
            .collect();
        Value::Object(projected)
    }
}

/// Strips characters that carry meaning inside the REST `or=(...)` syntax.
fn sanitize_needle(needle: &str) -> String {
    needle
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"' | '\\' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Compares two JSON scalars of the same kind; mixed kinds don't compare.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Ordering used for sorting: nulls and missing values sort after everything
/// else, so ascending puts them last and descending first.
fn sort_key_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"date": "2024-01-15", "company": "Samsung Electronics", "symbol": "005930"}),
            json!({"date": "2023-12-29", "company": "SK hynix", "symbol": "000660"}),
            json!({"date": "2024-01-01", "company": "Apple", "symbol": "AAPL"}),
            json!({"date": "2024-01-31", "company": "Alphabet", "symbol": "GOOGL"}),
            json!({"date": "2024-02-01", "company": "Samsung SDI", "symbol": "006400"}),
            json!({"date": null, "company": "Unscheduled", "symbol": "TBD"}),
        ]
    }

    #[test]
    fn renders_rest_params() {
        let query = Query::table("earnings_calendar")
            .gte("date", "2024-01-01")
            .lte("date", "2024-01-31")
            .search(&["company", "symbol"], "sam(sung)")
            .order("date", Direction::Asc)
            .limit(50);

        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("date".to_string(), "gte.2024-01-01".to_string()),
                ("date".to_string(), "lte.2024-01-31".to_string()),
                (
                    "or".to_string(),
                    "(company.ilike.*samsung*,symbol.ilike.*samsung*)".to_string()
                ),
                ("order".to_string(), "date.asc".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn inclusive_range_sorted_ascending() {
        let query = Query::table("earnings_calendar")
            .gte("date", "2024-01-01")
            .lte("date", "2024-01-31")
            .order("date", Direction::Asc);
        let dates: Vec<_> = query
            .apply(&rows())
            .iter()
            .map(|r| r["date"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-15", "2024-01-31"]);
    }

    #[test]
    fn search_is_case_insensitive_across_columns() {
        let query = Query::table("t").search(&["company", "symbol"], "SAMSUNG");
        assert_eq!(query.apply(&rows()).len(), 2);
        let by_symbol = Query::table("t").search(&["company", "symbol"], "googl");
        assert_eq!(by_symbol.apply(&rows())[0]["company"], "Alphabet");
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = Query::table("t").search(&["company"], " ** ");
        assert!(query.filters().is_empty());
    }

    #[test]
    fn nulls_sort_last_ascending_and_first_descending() {
        let asc = Query::table("t").order("date", Direction::Asc).apply(&rows());
        assert_eq!(asc.last().unwrap()["symbol"], "TBD");
        let desc = Query::table("t").order("date", Direction::Desc).apply(&rows());
        assert_eq!(desc[0]["symbol"], "TBD");
        assert_eq!(desc[1]["date"], "2024-02-01");
    }

    #[test]
    fn numeric_equality_and_projection() {
        let rows = vec![json!({"a": 1, "b": 2.0}), json!({"a": 2, "b": 3})];
        let query = Query::table("t").eq("a", 1).select("b");
        assert_eq!(query.apply(&rows), vec![json!({"b": 2.0})]);
        assert_eq!(
            Query::table("t").eq("a", 1).to_params()[1],
            ("a".to_string(), "eq.1".to_string())
        );
    }

    #[test]
    fn limit_keeps_leading_rows() {
        let query = Query::table("t").order("date", Direction::Desc).limit(2);
        let result = query.apply(&rows());
        assert_eq!(result.len(), 2);
    }
}
