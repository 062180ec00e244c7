//! Data models for the NL-SQL server.

pub mod connection;
pub mod query;
pub mod schema;
pub mod synthesis;

pub use connection::{ConnectionConfig, ConnectionConfigError, ConnectionInfo, DatabaseType};
pub use query::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_QUERY_TIMEOUT_SECS,
    MAX_ROW_LIMIT, QueryRequest, QueryResult,
};
pub use schema::{ColumnDescription, SchemaDescription, TableDescription};
pub use synthesis::{EXPLANATION_OTHER, EXPLANATION_READ, SynthesisRequest, SynthesisResult};
