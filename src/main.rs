//! NL-SQL Server - main entry point.
//!
//! Serves the natural-language to SQL tools over MCP (stdio or HTTP).

use clap::Parser;
use nl_sql_server::config::{Config, TransportMode};
use nl_sql_server::db::{ConnectionManager, QueryExecutor};
use nl_sql_server::mcp::NlSqlService;
use nl_sql_server::models::ConnectionConfig;
use nl_sql_server::synthesis::{OpenAiCompletionProvider, SqlSynthesizer};
use nl_sql_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        model = %config.llm_model,
        "Starting NL-SQL Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_configs = config.parse_databases()?;
    let connection_manager = Arc::new(ConnectionManager::new());
    for db_config in db_configs {
        info!(
            id = %db_config.id,
            writable = db_config.writable,
            "Connecting to preconfigured database"
        );
        let conn_config = ConnectionConfig::from_database_config(db_config)?;
        connection_manager.connect(conn_config).await?;
    }

    if config.llm_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; completion requests are sent without credentials");
    }
    let provider = OpenAiCompletionProvider::new(
        &config.llm_base_url,
        config.llm_model.clone(),
        config.llm_api_key.clone(),
        config.llm_timeout_duration(),
    )?;
    let synthesizer = Arc::new(SqlSynthesizer::new(Arc::new(provider))?);
    let executor = Arc::new(QueryExecutor::with_timeout(config.query_timeout));

    let service = NlSqlService::new(connection_manager, synthesizer, executor);

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(service).run().await,
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
