//! Read-only query execution.
//!
//! Rows are streamed and the stream is cut after `limit + 1` rows, so a
//! runaway SELECT never materializes more than it can return. The extra row
//! only tells us whether the result was truncated.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, MAX_QUERY_TIMEOUT_SECS, QueryRequest, QueryResult,
};
use futures_util::{Stream, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct QueryExecutor {
    default_timeout: Duration,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS as u64),
        }
    }

    /// Executor whose default timeout comes from configuration.
    pub fn with_timeout(timeout_secs: u64) -> Self {
        let secs = timeout_secs.clamp(1, MAX_QUERY_TIMEOUT_SECS as u64);
        Self {
            default_timeout: Duration::from_secs(secs),
        }
    }

    /// Run a statement that has already passed read-only validation.
    pub async fn execute_query(
        &self,
        pool: &DbPool,
        request: &QueryRequest,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = request.effective_limit();
        let query_timeout = request
            .requested_timeout()
            .map(|t| Duration::from_secs(t as u64))
            .unwrap_or(self.default_timeout);

        debug!(
            connection_id = %request.connection_id,
            limit = row_limit,
            timeout_secs = query_timeout.as_secs(),
            "Executing query"
        );

        let fetch_limit = row_limit as usize + 1;
        match pool {
            DbPool::MySql(p) => {
                use sqlx::Executor;
                let stream = p.fetch(request.sql.as_str());
                let rows = collect_limited(stream, fetch_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit, start, request.decode_binary))
            }
            DbPool::Postgres(p) => {
                use sqlx::Executor;
                let stream = p.fetch(request.sql.as_str());
                let rows = collect_limited(stream, fetch_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit, start, request.decode_binary))
            }
            DbPool::SQLite(p) => {
                use sqlx::Executor;
                let stream = p.fetch(request.sql.as_str());
                let rows = collect_limited(stream, fetch_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit, start, request.decode_binary))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

async fn collect_limited<S, R>(
    stream: S,
    fetch_limit: usize,
    query_timeout: Duration,
) -> DbResult<Vec<R>>
where
    S: Stream<Item = Result<R, sqlx::Error>>,
{
    let results = timeout(query_timeout, stream.take(fetch_limit).collect::<Vec<_>>())
        .await
        .map_err(|_| DbError::timeout("query execution", query_timeout.as_secs() as u32))?;

    results
        .into_iter()
        .map(|r| r.map_err(DbError::from))
        .collect()
}

fn process_rows<R: RowToJson>(
    rows: Vec<R>,
    row_limit: u32,
    start: Instant,
    decode_binary: bool,
) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;
    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.column_metadata();
    let truncated = rows.len() > row_limit as usize;
    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    let rows = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_map(decode_binary))
        .collect();

    QueryResult {
        columns,
        rows,
        truncated,
        execution_time_ms,
    }
}
