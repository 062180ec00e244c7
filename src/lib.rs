//! NL-SQL Server Library
//!
//! Turns natural-language questions into SQL for a described schema and
//! exposes that, plus schema introspection and read-only execution, as MCP
//! tools over SQLite, PostgreSQL and MySQL sessions.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod synthesis;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, SynthesisError};
pub use mcp::NlSqlService;
pub use synthesis::SqlSynthesizer;
