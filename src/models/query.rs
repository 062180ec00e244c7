//! Query-related data models for `run_query`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit, matching the limit generated SQL is asked to respect.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

pub const MAX_ROW_LIMIT: u32 = 10000;

pub const DEFAULT_QUERY_TIMEOUT_SECS: u32 = 30;

pub const MAX_QUERY_TIMEOUT_SECS: u32 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub connection_id: String,
    pub sql: String,
    /// Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
    /// Default: 30, max: 300
    #[serde(default)]
    pub timeout_secs: Option<u32>,
    /// Return binary columns as UTF-8 text when they decode cleanly
    #[serde(default)]
    pub decode_binary: bool,
}

impl QueryRequest {
    pub fn new(connection_id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            sql: sql.into(),
            limit: None,
            timeout_secs: None,
            decode_binary: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Row limit clamped to `1..=MAX_ROW_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .map(|l| l.clamp(1, MAX_ROW_LIMIT))
            .unwrap_or(DEFAULT_ROW_LIMIT)
    }

    /// Timeout clamped to `1..=MAX_QUERY_TIMEOUT_SECS`, if one was requested.
    pub fn requested_timeout(&self) -> Option<u32> {
        self.timeout_secs
            .map(|t| t.clamp(1, MAX_QUERY_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-specific type (e.g., "int8", "varchar", "TEXT")
    pub type_name: String,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// More rows were available than the limit allowed
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            execution_time_ms,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
