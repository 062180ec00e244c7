//! The SQL synthesis pipeline.

use crate::error::{ProviderError, SynthesisError};
use crate::models::{EXPLANATION_OTHER, EXPLANATION_READ, SynthesisRequest, SynthesisResult};
use crate::synthesis::denylist::Denylist;
use crate::synthesis::prompt::build_prompt;
use crate::synthesis::provider::CompletionProvider;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a question plus a schema into screened SQL.
///
/// Stateless apart from the provider handle: concurrent calls do not
/// interact, and every call makes at most one provider request.
pub struct SqlSynthesizer {
    provider: Arc<dyn CompletionProvider>,
    denylist: Denylist,
}

impl SqlSynthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Result<Self, regex::Error> {
        Ok(Self {
            provider,
            denylist: Denylist::new()?,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Validate the request, ask the provider for SQL, and screen the answer.
    ///
    /// The denylist sees the whole completion; only a screened completion
    /// has its Markdown fence removed.
    ///
    /// Request validation happens before the provider is contacted, so a
    /// rejected request never costs a completion.
    pub async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisResult, SynthesisError> {
        let question = request.natural_language_query.trim();
        if question.is_empty() {
            return Err(SynthesisError::invalid_request(
                "natural_language_query must not be empty",
            ));
        }

        let schema = match request.schema {
            Some(schema) if !schema.is_empty() => schema,
            _ => return Err(SynthesisError::SchemaMissing),
        };
        schema
            .validate_names()
            .map_err(SynthesisError::invalid_request)?;

        let prompt = build_prompt(&schema, question);
        let provider = self.provider.name();
        debug!(provider, tables = schema.tables.len(), "Calling completion provider");

        let start = Instant::now();
        let completion = self
            .provider
            .complete(&prompt)
            .await
            .map_err(|e| {
                warn!(provider, error = %e, "Completion provider failed");
                SynthesisError::completion_provider(provider, e)
            })?;

        // Screen the full completion: fence stripping discards text.
        let raw = completion.trim();
        if let Some(pattern) = self.denylist.check(raw) {
            warn!(provider, pattern, "Rejected generated SQL");
            debug!(sql = raw, "Rejected SQL text");
            return Err(SynthesisError::unsafe_generated_query(pattern));
        }

        let sql = strip_code_fence(raw);
        if sql.is_empty() {
            return Err(SynthesisError::completion_provider(
                provider,
                ProviderError::MalformedResponse("completion was empty".into()),
            ));
        }

        info!(
            provider,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated SQL"
        );

        Ok(SynthesisResult {
            explanation: explain(sql).to_string(),
            sql: sql.to_string(),
            natural_language_query: request.natural_language_query,
        })
    }
}

/// Coarse description of what the statement does. Not authoritative.
pub fn explain(sql: &str) -> &'static str {
    if sql.to_lowercase().contains("select") {
        EXPLANATION_READ
    } else {
        EXPLANATION_OTHER
    }
}

/// Trim, then drop one surrounding Markdown fence (```` ```sql ```` or ```` ``` ````).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The info string (e.g. `sql`) runs to the end of the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text() {
        assert_eq!(strip_code_fence("  SELECT 1 \n"), "SELECT 1");
    }

    #[test]
    fn test_strip_sql_fence() {
        assert_eq!(
            strip_code_fence("```sql\nSELECT name\nFROM users\n```"),
            "SELECT name\nFROM users"
        );
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fence("```\nSELECT 1;\n```\n"), "SELECT 1;");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fence("```sql\nSELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_explain() {
        assert_eq!(explain("SELECT * FROM t"), EXPLANATION_READ);
        assert_eq!(explain("with x as (select 1) select * from x"), EXPLANATION_READ);
        assert_eq!(explain("CALL some_proc()"), EXPLANATION_OTHER);
    }
}
