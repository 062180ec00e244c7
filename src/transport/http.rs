//! Streamable HTTP transport for the MCP server.

use crate::error::{DbError, DbResult};
use crate::mcp::NlSqlService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// SSE connections can keep the server alive; give up waiting after this.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// Serves MCP over HTTP. Every MCP session gets a clone of the same
/// [`NlSqlService`], so database sessions are shared between clients.
pub struct HttpTransport {
    service: NlSqlService,
    host: String,
    port: u16,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        service: NlSqlService,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            service,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let service = self.service.clone();
        let mcp = StreamableHttpService::new(
            move || Ok(service.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint becomes the fallback.
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(mcp)
        } else {
            axum::Router::new().nest_service(&self.endpoint, mcp)
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(addr = %bind_addr, "Starting MCP server with HTTP transport");

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal);

        let outcome = tokio::select! {
            result = server => result.map_err(|e| {
                error!(error = %e, "HTTP server error");
                DbError::internal(format!("HTTP server error: {}", e))
            }),
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => Ok(()),
        };

        info!("Closing database sessions");
        self.service.connection_manager().close_all().await;
        if outcome.is_ok() {
            info!("HTTP server stopped");
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionManager, QueryExecutor};
    use crate::error::ProviderError;
    use crate::synthesis::{CompletionProvider, SqlSynthesizer};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl CompletionProvider for Silent {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::MalformedResponse("unused".into()))
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    fn transport(host: &str, port: u16, endpoint: &str) -> HttpTransport {
        let service = NlSqlService::new(
            Arc::new(ConnectionManager::new()),
            Arc::new(SqlSynthesizer::new(Arc::new(Silent)).unwrap()),
            Arc::new(QueryExecutor::new()),
        );
        HttpTransport::new(service, host, port, endpoint)
    }

    #[test]
    fn test_http_transport_bind_addr() {
        let transport = transport("0.0.0.0", 3000, "/api/mcp");
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "0.0.0.0:3000");
        assert_eq!(transport.endpoint(), "/api/mcp");
    }

    #[test]
    fn test_router_builds_for_root_and_nested_endpoints() {
        let _ = transport("127.0.0.1", 8080, "/").router();
        let _ = transport("127.0.0.1", 8080, "/mcp").router();
    }
}
