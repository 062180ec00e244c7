//! Database access layer.
//!
//! - Session management (one pool per connection ID)
//! - Schema introspection into [`SchemaDescription`](crate::models::SchemaDescription)
//! - Bounded, read-only query execution
//! - Row to JSON conversion

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionManager, ConnectionSummary, DbPool};
pub use schema::SchemaInspector;
