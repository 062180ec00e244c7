//! MCP service implementation using rmcp.
//!
//! [`NlSqlService`] exposes the session, schema, synthesis and query tools
//! through rmcp's tool macros. All state lives in the shared handles passed
//! to [`NlSqlService::new`].

use crate::db::{ConnectionManager, QueryExecutor};
use crate::models::{ConnectionInfo, SynthesisResult};
use crate::synthesis::SqlSynthesizer;
use crate::tools::{
    ConnectInput, ConnectionToolHandler, DisconnectInput, DisconnectOutput, GenerateSqlInput,
    GetSchemaInput, GetSchemaOutput, ListConnectionsOutput, QueryToolHandler, RunQueryInput,
    RunQueryOutput, SchemaToolHandler, SynthesisToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct NlSqlService {
    connection_manager: Arc<ConnectionManager>,
    synthesizer: Arc<SqlSynthesizer>,
    executor: Arc<QueryExecutor>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl NlSqlService {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        synthesizer: Arc<SqlSynthesizer>,
        executor: Arc<QueryExecutor>,
    ) -> Self {
        Self {
            connection_manager,
            synthesizer,
            executor,
            tool_router: Self::tool_router(),
        }
    }

    /// Trimmed connection ID, or an error pointing at list_connections.
    fn validate_connection_id(&self, provided: &str) -> Result<String, McpError> {
        let trimmed = provided.trim();
        if trimmed.is_empty() {
            Err(McpError::invalid_params(
                "connection_id is required. Call list_connections first to get available session IDs.",
                None,
            ))
        } else {
            Ok(trimmed.to_string())
        }
    }

    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    fn schema_handler(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.connection_manager.clone())
    }
}

#[tool_router]
impl NlSqlService {
    #[tool(
        description = "List open database sessions.\nReturns session IDs, database types, database names and write access."
    )]
    async fn list_connections(&self) -> Json<ListConnectionsOutput> {
        let handler = ConnectionToolHandler::new(self.connection_manager.clone());
        Json(handler.list_connections().await)
    }

    #[tool(
        description = "Open a database session from a connection URL (postgres://, mysql://, sqlite:).\nThe session ID defaults to the database name. Sessions are read-only unless writable is set."
    )]
    async fn connect(
        &self,
        Parameters(input): Parameters<ConnectInput>,
    ) -> Result<Json<ConnectionInfo>, McpError> {
        let handler = ConnectionToolHandler::new(self.connection_manager.clone());
        Ok(Json(handler.connect(input).await?))
    }

    #[tool(description = "Close a database session and release its connections.")]
    async fn disconnect(
        &self,
        Parameters(input): Parameters<DisconnectInput>,
    ) -> Result<Json<DisconnectOutput>, McpError> {
        let mut input = input;
        input.connection_id = self.validate_connection_id(&input.connection_id)?;
        let handler = ConnectionToolHandler::new(self.connection_manager.clone());
        Ok(Json(handler.disconnect(input).await?))
    }

    #[tool(
        description = "Describe the tables of a session: columns, data types, primary/foreign key flags and approximate row counts.\nThe result can be passed as the schema argument of generate_sql."
    )]
    async fn get_schema(
        &self,
        Parameters(input): Parameters<GetSchemaInput>,
    ) -> Result<Json<GetSchemaOutput>, McpError> {
        let mut input = input;
        input.connection_id = self.validate_connection_id(&input.connection_id)?;
        Ok(Json(self.schema_handler().get_schema(input).await?))
    }

    #[tool(
        description = "Translate a natural-language question into SQL for a schema.\nPass the schema explicitly, or a connection_id to describe that session's live schema.\nThe SQL is screened for destructive statements and is never executed by this tool."
    )]
    async fn generate_sql(
        &self,
        Parameters(input): Parameters<GenerateSqlInput>,
    ) -> Result<Json<SynthesisResult>, McpError> {
        let handler = SynthesisToolHandler::new(self.schema_handler(), self.synthesizer.clone());
        handler.generate_sql(input).await.map(Json)
    }

    #[tool(
        description = "Execute a read-only statement (SELECT, SHOW, EXPLAIN SELECT) on a session.\nOther statements are refused. Output format: json (default), table, or markdown."
    )]
    async fn run_query(
        &self,
        Parameters(input): Parameters<RunQueryInput>,
    ) -> Result<Json<RunQueryOutput>, McpError> {
        let mut input = input;
        input.connection_id = self.validate_connection_id(&input.connection_id)?;
        let handler = QueryToolHandler::new(self.connection_manager.clone(), self.executor.clone());
        Ok(Json(handler.run_query(input).await?))
    }
}

#[tool_handler]
impl ServerHandler for NlSqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nl-sql-server".to_owned(),
                title: Some("NL-SQL Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Natural-language to SQL tools.\n\
                \n\
                ## Workflow\n\
                1. `list_connections` (or `connect`) to get a session ID\n\
                2. `get_schema` to see the tables\n\
                3. `generate_sql` with the question and the schema or connection_id\n\
                4. Review the SQL, then `run_query` to execute it read-only\n\
                \n\
                ## Notes\n\
                - SQL is generated by the `{}` completion provider and screened for\n\
                  DROP/DELETE/TRUNCATE/ALTER/INSERT/UPDATE/CREATE/GRANT/REVOKE.\n\
                - The explanation returned with generated SQL is a rough hint only.\n\
                - `run_query` refuses anything but SELECT, SHOW and EXPLAIN SELECT.",
                self.synthesizer.provider_name()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::synthesis::CompletionProvider;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl CompletionProvider for Fixed {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("SELECT 1".into())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn create_test_service() -> NlSqlService {
        let synthesizer = SqlSynthesizer::new(Arc::new(Fixed)).unwrap();
        NlSqlService::new(
            Arc::new(ConnectionManager::new()),
            Arc::new(synthesizer),
            Arc::new(QueryExecutor::new()),
        )
    }

    #[test]
    fn test_validate_connection_id_trims_whitespace() {
        let service = create_test_service();
        assert_eq!(service.validate_connection_id("  mydb  ").unwrap(), "mydb");
    }

    #[test]
    fn test_validate_connection_id_rejects_blank() {
        let service = create_test_service();
        for id in ["", "   "] {
            let err = service.validate_connection_id(id).unwrap_err();
            assert!(err.message.contains("connection_id is required"));
        }
    }

    #[test]
    fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "connect",
                "disconnect",
                "generate_sql",
                "get_schema",
                "list_connections",
                "run_query"
            ]
        );
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "nl-sql-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("`fixed`"));
    }
}
