//! MCP server integration.
//!
//! Binds the tool handlers to the MCP protocol using the rmcp framework.

pub mod service;

pub use service::NlSqlService;
