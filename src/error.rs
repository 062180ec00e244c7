//! Error types for the NL-SQL server.
//!
//! Three families live here:
//! - [`DbError`] for session, introspection and query failures
//! - [`SynthesisError`] for the SQL synthesis pipeline
//! - [`ProviderError`] for the completion provider collaborator
//!
//! Every variant carries a message an AI assistant can act on, and both
//! tool-facing families convert into `rmcp::ErrorData`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Connection not found: {connection_id}")]
    ConnectionNotFound { connection_id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn connection_not_found(connection_id: impl Into<String>) -> Self {
        Self::ConnectionNotFound {
            connection_id: connection_id.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::ConnectionNotFound { .. } => {
                Some("Use list_connections to see open sessions, or connect first")
            }
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or narrowing the query")
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The session was disconnected; connect again",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            other => DbError::internal(format!("Unexpected database error: {}", other)),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Failures of the completion provider collaborator.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // Drop the URL so query strings never end up in messages.
        Self::Http(err.without_url().to_string())
    }
}

/// Terminal outcomes of a synthesis request other than success.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Database schema is required")]
    SchemaMissing,

    #[error("Completion provider '{provider}' failed: {source}")]
    CompletionProvider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Never carries the rejected SQL text.
    #[error("Generated query contains potentially dangerous operations (matched {pattern})")]
    UnsafeGeneratedQuery { pattern: String },
}

impl SynthesisError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn completion_provider(provider: impl Into<String>, source: ProviderError) -> Self {
        Self::CompletionProvider {
            provider: provider.into(),
            source,
        }
    }

    pub fn unsafe_generated_query(pattern: impl Into<String>) -> Self {
        Self::UnsafeGeneratedQuery {
            pattern: pattern.into(),
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "Provide a non-empty question and a well-formed schema",
            Self::SchemaMissing => {
                "Pass a schema with at least one table, or a connection_id to introspect"
            }
            Self::CompletionProvider { .. } => {
                "Check the completion provider settings and try again"
            }
            Self::UnsafeGeneratedQuery { .. } => {
                "Rephrase the question as a read-only request"
            }
        }
    }
}

fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData, carrying the suggestion in `data`.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::InvalidInput { .. } | DbError::Permission { .. } | DbError::Schema { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::ConnectionNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            DbError::Connection { .. } | DbError::Timeout { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }

            DbError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }
        }
    }
}

impl From<SynthesisError> for rmcp::ErrorData {
    fn from(err: SynthesisError) -> Self {
        let data = suggestion_data(Some(err.suggestion()));
        match &err {
            SynthesisError::InvalidRequest { .. }
            | SynthesisError::SchemaMissing
            | SynthesisError::UnsafeGeneratedQuery { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }
            SynthesisError::CompletionProvider { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
