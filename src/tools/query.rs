//! Read-only execution tool (`run_query`).
//!
//! Statements are parsed and checked by [`sql_validator`] before they reach
//! the session; anything that is not a plain read is refused.

use crate::db::{ConnectionManager, QueryExecutor};
use crate::error::DbResult;
use crate::models::{ColumnMetadata, QueryRequest, QueryResult};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

fn default_decode_binary() -> bool {
    true
}

/// Input for the run_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunQueryInput {
    /// Session ID from list_connections
    pub connection_id: String,
    /// Read-only SQL, typically from generate_sql
    pub sql: String,
    /// Maximum rows to return. Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
    /// Query timeout in seconds. Default: server setting, max: 300
    #[serde(default)]
    pub timeout_secs: Option<u32>,
    /// "json" returns structured rows, "table" an ASCII table, "markdown" a markdown table
    #[serde(default)]
    pub format: OutputFormat,
    /// Decode binary columns as UTF-8 text when possible (default), otherwise base64
    #[serde(default = "default_decode_binary")]
    pub decode_binary: bool,
}

/// Output from the run_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RunQueryOutput {
    /// Empty for table/markdown output
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMetadata>,
    /// Empty for table/markdown output
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// True if more rows existed than the limit allowed
    pub truncated: bool,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl RunQueryOutput {
    pub fn from_result(result: QueryResult, format: OutputFormat) -> Self {
        let formatted = match format {
            OutputFormat::Json => None,
            OutputFormat::Table => Some(format_as_table(&result)),
            OutputFormat::Markdown => Some(format_as_markdown(&result)),
        };
        let row_count = result.row_count();
        let (columns, rows) = if formatted.is_some() {
            (Vec::new(), Vec::new())
        } else {
            (result.columns, result.rows)
        };
        Self {
            columns,
            rows,
            formatted,
            truncated: result.truncated,
            row_count,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

pub struct QueryToolHandler {
    connection_manager: Arc<ConnectionManager>,
    executor: Arc<QueryExecutor>,
}

impl QueryToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>, executor: Arc<QueryExecutor>) -> Self {
        Self {
            connection_manager,
            executor,
        }
    }

    pub async fn run_query(&self, input: RunQueryInput) -> DbResult<RunQueryOutput> {
        let connection_id = input.connection_id.trim();
        let pool = self.connection_manager.get_pool(connection_id).await?;

        sql_validator::validate_readonly(&input.sql, pool.db_type())?;

        let request = QueryRequest {
            connection_id: connection_id.to_string(),
            sql: input.sql.clone(),
            limit: input.limit,
            timeout_secs: input.timeout_secs,
            decode_binary: input.decode_binary,
        };
        let result = self.executor.execute_query(&pool, &request).await?;

        info!(
            connection_id = %connection_id,
            rows = result.row_count(),
            truncated = result.truncated,
            elapsed_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(RunQueryOutput::from_result(result, input.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::db::DbPool;
    use crate::error::DbError;
    use crate::models::ConnectionConfig;

    async fn seeded_handler() -> (tempfile::TempDir, QueryToolHandler) {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(ConnectionManager::new());
        let config = ConnectionConfig::new(
            "people",
            format!("sqlite:{}", dir.path().join("people.db").display()),
            true,
            "people",
            PoolOptions::default(),
        )
        .unwrap();
        manager.connect(config).await.unwrap();
        if let DbPool::SQLite(pool) = manager.get_pool("people").await.unwrap() {
            sqlx::query("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO people (name) VALUES ('ada'), ('grace'), ('alan')")
                .execute(&pool)
                .await
                .unwrap();
        }
        let handler = QueryToolHandler::new(manager, Arc::new(QueryExecutor::new()));
        (dir, handler)
    }

    fn input(sql: &str) -> RunQueryInput {
        RunQueryInput {
            connection_id: "people".into(),
            sql: sql.into(),
            limit: None,
            timeout_secs: None,
            format: OutputFormat::Json,
            decode_binary: true,
        }
    }

    #[tokio::test]
    async fn test_run_select_json() {
        let (_dir, handler) = seeded_handler().await;
        let out = handler
            .run_query(input("SELECT id, name FROM people ORDER BY id"))
            .await
            .unwrap();
        assert_eq!(out.row_count, 3);
        assert!(!out.truncated);
        assert!(out.formatted.is_none());
        assert_eq!(out.rows[0]["name"], "ada");
    }

    #[tokio::test]
    async fn test_run_select_table_with_limit() {
        let (_dir, handler) = seeded_handler().await;
        let mut req = input("SELECT name FROM people ORDER BY id");
        req.limit = Some(2);
        req.format = OutputFormat::Table;
        let out = handler.run_query(req).await.unwrap();
        assert_eq!(out.row_count, 2);
        assert!(out.truncated);
        assert!(out.rows.is_empty());
        assert!(out.formatted.unwrap().contains("| grace |"));
    }

    #[tokio::test]
    async fn test_write_refused_even_on_writable_session() {
        let (_dir, handler) = seeded_handler().await;
        let err = handler
            .run_query(input("DELETE FROM people"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Permission { .. }));

        let still_there = handler
            .run_query(input("SELECT COUNT(*) AS n FROM people"))
            .await
            .unwrap();
        assert_eq!(still_there.rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (_dir, handler) = seeded_handler().await;
        let mut req = input("SELECT 1");
        req.connection_id = "other".into();
        let err = handler.run_query(req).await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionNotFound { .. }));
    }
}
