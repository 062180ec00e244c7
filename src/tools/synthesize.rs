//! SQL generation tool (`generate_sql`).

use crate::error::SynthesisError;
use crate::models::{SchemaDescription, SynthesisRequest, SynthesisResult};
use crate::synthesis::SqlSynthesizer;
use crate::tools::schema::SchemaToolHandler;
use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Input for the generate_sql tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateSqlInput {
    /// The question to answer, in plain language
    #[serde(alias = "natural_language_query", alias = "naturalLanguageQuery")]
    pub query: String,
    /// Schema to generate against. Takes precedence over connection_id.
    #[serde(default)]
    pub schema: Option<SchemaDescription>,
    /// Session whose live schema is used when no schema is supplied
    #[serde(default)]
    pub connection_id: Option<String>,
}

pub struct SynthesisToolHandler {
    schema_handler: SchemaToolHandler,
    synthesizer: Arc<SqlSynthesizer>,
}

impl SynthesisToolHandler {
    pub fn new(schema_handler: SchemaToolHandler, synthesizer: Arc<SqlSynthesizer>) -> Self {
        Self {
            schema_handler,
            synthesizer,
        }
    }

    /// Resolve the schema, then synthesize. Never executes the result.
    pub async fn generate_sql(&self, input: GenerateSqlInput) -> Result<SynthesisResult, McpError> {
        // A blank question fails before any catalog scan.
        if input.query.trim().is_empty() {
            return Err(
                SynthesisError::invalid_request("natural_language_query must not be empty").into(),
            );
        }

        let supplied = input.schema.filter(|s| !s.is_empty());
        let connection_id = input
            .connection_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let schema = match (supplied, connection_id) {
            (Some(schema), _) => Some(schema),
            (None, Some(id)) => Some(self.schema_handler.introspect(id).await?),
            (None, None) => None,
        };

        let request = SynthesisRequest {
            natural_language_query: input.query,
            schema,
        };
        Ok(self.synthesizer.synthesize(request).await?)
    }
}
