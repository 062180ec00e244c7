//! Request and result types for SQL synthesis.

use crate::models::SchemaDescription;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Explanation attached to results whose SQL reads data.
pub const EXPLANATION_READ: &str = "retrieves data from the database tables";
/// Explanation attached to every other result.
pub const EXPLANATION_OTHER: &str = "performs a database operation";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SynthesisRequest {
    #[serde(alias = "naturalLanguageQuery", alias = "query")]
    pub natural_language_query: String,
    /// Absent schemas are representable so they can be rejected explicitly.
    #[serde(default)]
    pub schema: Option<SchemaDescription>,
}

impl SynthesisRequest {
    pub fn new(natural_language_query: impl Into<String>, schema: SchemaDescription) -> Self {
        Self {
            natural_language_query: natural_language_query.into(),
            schema: Some(schema),
        }
    }

    pub fn without_schema(natural_language_query: impl Into<String>) -> Self {
        Self {
            natural_language_query: natural_language_query.into(),
            schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SynthesisResult {
    /// Generated SQL, already checked against the denylist
    pub sql: String,
    /// The question exactly as received
    pub natural_language_query: String,
    /// Coarse, non-authoritative description of what the SQL does
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_short_query_field() {
        let req: SynthesisRequest =
            serde_json::from_str(r#"{"query": "how many users?", "schema": {"tables": []}}"#)
                .unwrap();
        assert_eq!(req.natural_language_query, "how many users?");
        assert!(req.schema.unwrap().is_empty());
    }

    #[test]
    fn test_request_schema_optional() {
        let req: SynthesisRequest =
            serde_json::from_str(r#"{"natural_language_query": "list users"}"#).unwrap();
        assert!(req.schema.is_none());
    }
}
