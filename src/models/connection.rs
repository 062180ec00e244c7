//! Session data models.
//!
//! A session is a named connection pool registered with the
//! [`ConnectionManager`](crate::db::ConnectionManager).

use crate::config::{DatabaseConfig, PoolOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuration for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    pub db_type: DatabaseType,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    #[serde(default)]
    pub writable: bool,
    pub database: String,
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl ConnectionConfig {
    pub fn new(
        id: impl Into<String>,
        connection_string: impl Into<String>,
        writable: bool,
        database: impl Into<String>,
        pool_options: PoolOptions,
    ) -> Result<Self, ConnectionConfigError> {
        let id = id.into();
        let connection_string = connection_string.into();

        if id.is_empty() {
            return Err(ConnectionConfigError::EmptyId);
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConnectionConfigError::InvalidId(id));
        }

        let db_type = DatabaseType::from_connection_string(&connection_string).ok_or_else(|| {
            ConnectionConfigError::UnknownDatabaseType(scheme_of(&connection_string).to_string())
        })?;

        Ok(Self {
            id,
            db_type,
            connection_string,
            writable,
            database: database.into(),
            pool_options,
        })
    }

    /// Build a session config from a parsed CLI/tool database argument.
    pub fn from_database_config(config: DatabaseConfig) -> Result<Self, ConnectionConfigError> {
        Self::new(
            config.id,
            config.connection_string,
            config.writable,
            config.database,
            config.pool_options,
        )
    }

    /// Connection string with the password replaced by `****`.
    pub fn masked_connection_string(&self) -> String {
        if let Some(at_pos) = self.connection_string.find('@') {
            let scheme_end = self
                .connection_string
                .find("://")
                .map(|p| p + 3)
                .unwrap_or(0);
            if let Some(colon_pos) = self.connection_string[scheme_end..at_pos].rfind(':') {
                let colon_pos = scheme_end + colon_pos;
                let prefix = &self.connection_string[..colon_pos + 1];
                let suffix = &self.connection_string[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.connection_string.clone()
    }
}

// Only the scheme is echoed back in errors; the rest may hold credentials.
fn scheme_of(connection_string: &str) -> &str {
    connection_string
        .split_once(':')
        .map(|(scheme, _)| scheme)
        .unwrap_or("<none>")
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection ID cannot be empty")]
    EmptyId,

    #[error("Connection ID contains invalid characters: {0}")]
    InvalidId(String),

    #[error("Unknown database type for scheme '{0}' (expected postgres, mysql or sqlite)")]
    UnknownDatabaseType(String),
}

/// Information about a session, returned after a successful `connect`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub database_type: DatabaseType,
    pub server_version: Option<String>,
    pub writable: bool,
    pub database: String,
}
