//! Postgres statement rendering.
//!
//! Relation names come from validated configuration and are interpolated;
//! every request-derived value travels as a bind parameter.

use propscope_core::{contains_pattern, DatabaseAnalysisStats, ListQuery, SortOrder, SuggestQuery};
use tokio_postgres::types::ToSql;

/// Owned bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    TextArray(Vec<String>),
    BigInt(i64),
}

impl SqlValue {
    fn as_param(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Text(v) => v,
            SqlValue::TextArray(v) => v,
            SqlValue::BigInt(v) => v,
        }
    }
}

/// SQL text plus its positional parameters (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(SqlValue::as_param).collect()
    }
}

/// Accumulates `WHERE` predicates and their parameters.
struct Filters {
    predicates: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filters {
    fn new() -> Self {
        Self {
            predicates: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Push `value` and return its placeholder.
    fn bind(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    fn push(&mut self, predicate: String) {
        self.predicates.push(predicate);
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }
}

fn list_filters(query: &ListQuery) -> Filters {
    let mut filters = Filters::new();

    let city = filters.bind(SqlValue::Text(query.city().to_string()));
    filters.push(format!("t.city = {}", city));

    if let Some(suburbs) = query.suburb_filter() {
        let p = filters.bind(SqlValue::TextArray(suburbs.to_vec()));
        filters.push(format!("t.suburb = ANY({})", p));
    }

    if let Some(search) = query.search() {
        if search.is_exact() {
            let p = filters.bind(SqlValue::Text(search.text().to_string()));
            filters.push(format!("t.address = {}", p));
        } else {
            let p = filters.bind(SqlValue::Text(contains_pattern(search.text())));
            filters.push(format!("t.address ILIKE {}", p));
        }
    }

    filters
}

fn order_by(order: SortOrder) -> &'static str {
    match order {
        SortOrder::IdAscending => "t.id ASC",
        SortOrder::ConfidenceDescending => "t.confidence_score DESC NULLS LAST, t.id ASC",
    }
}

/// One page of rows as JSON objects.
pub fn page(relation: &str, query: &ListQuery) -> Statement {
    let mut filters = list_filters(query);
    let limit = filters.bind(SqlValue::BigInt(query.limit() as i64));
    let offset = filters.bind(SqlValue::BigInt(query.offset() as i64));
    Statement {
        sql: format!(
            "SELECT row_to_json(t) FROM {relation} t{where_clause} ORDER BY {order} LIMIT {limit} OFFSET {offset}",
            where_clause = filters.where_clause(),
            order = order_by(query.order()),
        ),
        values: filters.values,
    }
}

/// Count of rows matching the page query's filters.
pub fn count(relation: &str, query: &ListQuery) -> Statement {
    let filters = list_filters(query);
    Statement {
        sql: format!(
            "SELECT count(*) FROM {relation} t{}",
            filters.where_clause()
        ),
        values: filters.values,
    }
}

/// Single row by identifier or listing URL.
pub fn by_id(relation: &str, id: &str) -> Statement {
    Statement {
        sql: format!(
            "SELECT row_to_json(t) FROM {relation} t WHERE t.id::text = $1 OR t.property_url = $1 LIMIT 1"
        ),
        values: vec![SqlValue::Text(id.to_string())],
    }
}

/// Address suggestions, alphabetical.
pub fn suggest(relation: &str, query: &SuggestQuery, limit: usize) -> Statement {
    let mut filters = Filters::new();
    let pattern = filters.bind(SqlValue::Text(contains_pattern(query.text())));
    filters.push(format!("t.address ILIKE {}", pattern));
    if let Some(city) = query.city() {
        let p = filters.bind(SqlValue::Text(city.to_string()));
        filters.push(format!("t.city = {}", p));
    }
    let limit = filters.bind(SqlValue::BigInt(limit as i64));
    Statement {
        sql: format!(
            "SELECT json_build_object('id', t.id, 'address', t.address, 'suburb', t.suburb, 'city', t.city) \
             FROM {relation} t{} ORDER BY t.address ASC LIMIT {limit}",
            filters.where_clause()
        ),
        values: filters.values,
    }
}

/// Most recent stats row.
pub fn latest_stats(relation: &str) -> Statement {
    Statement {
        sql: format!(
            "SELECT row_to_json(t) FROM {relation} t ORDER BY t.created_at DESC NULLS LAST LIMIT 1"
        ),
        values: Vec::new(),
    }
}

/// Property count for one region.
pub fn region_count(relation: &str, region: &str) -> Statement {
    Statement {
        sql: format!("SELECT count(*) FROM {relation} t WHERE t.region = $1"),
        values: vec![SqlValue::Text(region.to_string())],
    }
}

/// Insert a stats row; `created_at` is left to the column default.
pub fn insert_stats(relation: &str, stats: &DatabaseAnalysisStats) -> Statement {
    let columns = [
        ("auckland_properties", stats.auckland_properties),
        ("wellington_properties", stats.wellington_properties),
        ("auckland_forecast_total", stats.auckland_forecast_total),
        ("wellington_forecast_total", stats.wellington_forecast_total),
        ("auckland_forecast_90_percent", stats.auckland_forecast_90_percent),
        ("auckland_forecast_80_percent", stats.auckland_forecast_80_percent),
        ("auckland_forecast_60_percent", stats.auckland_forecast_60_percent),
        ("wellington_forecast_90_percent", stats.wellington_forecast_90_percent),
        ("wellington_forecast_80_percent", stats.wellington_forecast_80_percent),
        ("wellington_forecast_60_percent", stats.wellington_forecast_60_percent),
    ];
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    // Explicit casts let the server accept int8 binds for integer columns.
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}::bigint", i)).collect();
    Statement {
        sql: format!(
            "INSERT INTO {relation} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        ),
        values: columns.iter().map(|(_, v)| SqlValue::BigInt(*v)).collect(),
    }
}
