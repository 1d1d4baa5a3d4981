use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Table name to ordered `"column (TYPE)"` descriptors.
pub type SchemaSnapshot = BTreeMap<String, Vec<String>>;

/// A single result row keyed by column name.
pub type Row = Map<String, Value>;

/// Materialized output of a read-only statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Body returned by `POST /ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl AskResponse {
    pub fn new(sql: String, result: QueryResult) -> Self {
        Self {
            sql,
            columns: result.columns,
            rows: result.rows,
        }
    }
}
