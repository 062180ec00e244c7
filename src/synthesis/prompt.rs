//! Prompt construction.

use crate::models::{ColumnDescription, SchemaDescription, TableDescription};

/// Text block the provider sees for one table.
fn describe_table(table: &TableDescription) -> String {
    let columns = table
        .columns
        .iter()
        .map(describe_column)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Table: {}\nColumns: {}\nRow count: ~{}",
        table.name,
        columns,
        table.row_count_estimate.unwrap_or(0)
    )
}

fn describe_column(column: &ColumnDescription) -> String {
    let mut text = format!("{} ({}", column.name, column.data_type);
    if column.is_primary_key {
        text.push_str(", PRIMARY KEY");
    }
    if column.is_foreign_key {
        text.push_str(", FOREIGN KEY");
    }
    text.push(')');
    text
}

/// Render every table, separated by a blank line.
pub fn describe_schema(schema: &SchemaDescription) -> String {
    schema
        .tables
        .iter()
        .map(describe_table)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full prompt: schema context, the quoted question, and the fixed rules.
pub fn build_prompt(schema: &SchemaDescription, query: &str) -> String {
    format!(
        r#"Given the following database schema:

{}

Convert this natural language query to SQL:
"{}"

Rules:
1. Return only valid SQL
2. Use proper table and column names from the schema
3. Add appropriate WHERE clauses for safety
4. Limit results to 100 rows max
5. Use proper JOIN syntax when needed

SQL Query:"#,
        describe_schema(schema),
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> SchemaDescription {
        SchemaDescription::new(vec![
            TableDescription::new("users")
                .with_row_count(42)
                .with_column(ColumnDescription::new("id", "integer").primary_key())
                .with_column(ColumnDescription::new("name", "text")),
            TableDescription::new("orders")
                .with_column(ColumnDescription::new("id", "integer").primary_key())
                .with_column(ColumnDescription::new("user_id", "integer").foreign_key()),
        ])
    }

    #[test]
    fn test_describe_schema() {
        let text = describe_schema(&users_schema());
        assert_eq!(
            text,
            "Table: users\n\
             Columns: id (integer, PRIMARY KEY), name (text)\n\
             Row count: ~42\n\
             \n\
             Table: orders\n\
             Columns: id (integer, PRIMARY KEY), user_id (integer, FOREIGN KEY)\n\
             Row count: ~0"
        );
    }

    #[test]
    fn test_column_with_both_key_flags() {
        let col = ColumnDescription::new("tenant_id", "uuid")
            .primary_key()
            .foreign_key();
        assert_eq!(describe_column(&col), "tenant_id (uuid, PRIMARY KEY, FOREIGN KEY)");
    }

    #[test]
    fn test_prompt_embeds_schema_query_and_rules() {
        let prompt = build_prompt(&users_schema(), "how many users are there?");
        assert!(prompt.starts_with("Given the following database schema:\n\nTable: users\n"));
        assert!(prompt.contains("\"how many users are there?\""));
        assert!(prompt.contains("4. Limit results to 100 rows max"));
        assert!(prompt.contains("5. Use proper JOIN syntax when needed"));
        assert!(prompt.ends_with("SQL Query:"));
    }
}
