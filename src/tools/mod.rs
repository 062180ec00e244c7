//! MCP tool implementations.
//!
//! - `connection`: `connect`, `disconnect`, `list_connections`
//! - `schema`: `get_schema`
//! - `synthesize`: `generate_sql`
//! - `query`: `run_query`, guarded by `sql_validator`
//! - `format`: table and markdown renderings of query results

pub mod connection;
pub mod format;
pub mod query;
pub mod schema;
pub mod sql_validator;
pub mod synthesize;

pub use connection::{
    ConnectInput, ConnectionToolHandler, DisconnectInput, DisconnectOutput, ListConnectionsOutput,
};
pub use format::OutputFormat;
pub use query::{QueryToolHandler, RunQueryInput, RunQueryOutput};
pub use schema::{GetSchemaInput, GetSchemaOutput, SchemaToolHandler};
pub use synthesize::{GenerateSqlInput, SynthesisToolHandler};
