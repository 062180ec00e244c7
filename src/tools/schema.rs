//! Schema introspection tool (`get_schema`).

use crate::db::{ConnectionManager, SchemaInspector};
use crate::error::DbResult;
use crate::models::{DatabaseType, SchemaDescription};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the get_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSchemaInput {
    /// Session ID from list_connections
    pub connection_id: String,
}

/// Output for the get_schema tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GetSchemaOutput {
    pub connection_id: String,
    pub database_type: DatabaseType,
    /// Tables with columns, key flags and row estimates. Can be passed
    /// unchanged as the `schema` argument of generate_sql.
    pub schema: SchemaDescription,
    pub table_count: usize,
}

pub struct SchemaToolHandler {
    connection_manager: Arc<ConnectionManager>,
}

impl SchemaToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    /// Describe the session's schema as it is right now. Nothing is cached.
    pub async fn introspect(&self, connection_id: &str) -> DbResult<SchemaDescription> {
        let pool = self.connection_manager.get_pool(connection_id).await?;
        let schema = SchemaInspector::introspect(&pool).await?;
        info!(
            connection_id = %connection_id,
            tables = schema.tables.len(),
            "Introspected schema"
        );
        Ok(schema)
    }

    pub async fn get_schema(&self, input: GetSchemaInput) -> DbResult<GetSchemaOutput> {
        let connection_id = input.connection_id.trim().to_string();
        let config = self.connection_manager.get_config(&connection_id).await?;
        let schema = self.introspect(&connection_id).await?;
        Ok(GetSchemaOutput {
            connection_id,
            database_type: config.db_type,
            table_count: schema.tables.len(),
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::error::DbError;
    use crate::models::ConnectionConfig;

    #[tokio::test]
    async fn test_get_schema_reflects_live_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");
        let manager = Arc::new(ConnectionManager::new());
        let config = ConnectionConfig::new(
            "inv",
            format!("sqlite:{}", path.display()),
            true,
            "inventory",
            PoolOptions::default(),
        )
        .unwrap();
        manager.connect(config).await.unwrap();

        let handler = SchemaToolHandler::new(manager.clone());
        let empty = handler
            .get_schema(GetSchemaInput {
                connection_id: "inv".into(),
            })
            .await
            .unwrap();
        assert_eq!(empty.table_count, 0);

        if let crate::db::DbPool::SQLite(pool) = manager.get_pool("inv").await.unwrap() {
            sqlx::query("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)")
                .execute(&pool)
                .await
                .unwrap();
        }

        let out = handler
            .get_schema(GetSchemaInput {
                connection_id: " inv ".into(),
            })
            .await
            .unwrap();
        assert_eq!(out.connection_id, "inv");
        assert_eq!(out.database_type, DatabaseType::SQLite);
        assert_eq!(out.table_count, 1);
        let items = out.schema.table("items").unwrap();
        assert!(items.column("id").unwrap().is_primary_key);
    }

    #[tokio::test]
    async fn test_get_schema_unknown_session() {
        let handler = SchemaToolHandler::new(Arc::new(ConnectionManager::new()));
        let err = handler
            .get_schema(GetSchemaInput {
                connection_id: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConnectionNotFound { .. }));
    }
}
