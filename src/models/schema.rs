//! Schema description models.
//!
//! A [`SchemaDescription`] is what the synthesizer shows the completion
//! provider. It is produced fresh by introspection or supplied by the caller,
//! and is never cached.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered list of tables visible to SQL generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDescription {
    #[serde(default)]
    pub tables: Vec<TableDescription>,
}

impl SchemaDescription {
    pub fn new(tables: Vec<TableDescription>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableDescription> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Check that table names are unique and that column names are unique
    /// within each table. Returns a message naming the first clash.
    pub fn validate_names(&self) -> Result<(), String> {
        let mut tables = HashSet::new();
        for table in &self.tables {
            if !tables.insert(table.name.as_str()) {
                return Err(format!("Duplicate table name '{}' in schema", table.name));
            }
            let mut columns = HashSet::new();
            for column in &table.columns {
                if !columns.insert(column.name.as_str()) {
                    return Err(format!(
                        "Duplicate column name '{}' in table '{}'",
                        column.name, table.name
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableDescription {
    pub name: String,
    /// Approximate row count; rendered as 0 when unknown
    #[serde(
        default,
        alias = "rowCount",
        alias = "rowCountEstimate",
        skip_serializing_if = "Option::is_none"
    )]
    pub row_count_estimate: Option<u64>,
    #[serde(default)]
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            row_count_estimate: None,
            columns: Vec::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count_estimate = Some(row_count);
        self
    }

    pub fn with_column(mut self, column: ColumnDescription) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescription {
    pub name: String,
    /// Type as reported by the database (e.g. `varchar(255)`, `INTEGER`)
    #[serde(alias = "dataType", alias = "type")]
    pub data_type: String,
    #[serde(default, alias = "isPrimary", alias = "isPrimaryKey")]
    pub is_primary_key: bool,
    #[serde(default, alias = "isForeign", alias = "isForeignKey")]
    pub is_foreign_key: bool,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: false,
            is_foreign_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_schema() -> SchemaDescription {
        SchemaDescription::new(vec![
            TableDescription::new("users")
                .with_row_count(42)
                .with_column(ColumnDescription::new("id", "int").primary_key())
                .with_column(ColumnDescription::new("name", "varchar(255)")),
            TableDescription::new("orders")
                .with_column(ColumnDescription::new("id", "int").primary_key())
                .with_column(ColumnDescription::new("user_id", "int").foreign_key()),
        ])
    }

    #[test]
    fn test_validate_names_ok() {
        assert!(shop_schema().validate_names().is_ok());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut schema = shop_schema();
        schema.tables.push(TableDescription::new("users"));
        let err = schema.validate_names().unwrap_err();
        assert!(err.contains("users"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = SchemaDescription::new(vec![
            TableDescription::new("t")
                .with_column(ColumnDescription::new("a", "int"))
                .with_column(ColumnDescription::new("a", "text")),
        ]);
        let err = schema.validate_names().unwrap_err();
        assert!(err.contains("'a'"));
        assert!(err.contains("'t'"));
    }

    #[test]
    fn test_same_column_name_in_different_tables_allowed() {
        let schema = shop_schema();
        assert!(schema.table("users").unwrap().column("id").is_some());
        assert!(schema.table("orders").unwrap().column("id").is_some());
        assert!(schema.validate_names().is_ok());
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_value(shop_schema()).unwrap();
        assert_eq!(json["tables"][0]["row_count_estimate"], 42);
        assert_eq!(json["tables"][0]["columns"][0]["is_primary_key"], true);
        assert_eq!(json["tables"][1]["columns"][1]["is_foreign_key"], true);
        assert!(json["tables"][1].get("row_count_estimate").is_none());
    }

    #[test]
    fn test_deserializes_dashboard_shape() {
        let json = serde_json::json!({
            "tables": [{
                "name": "users",
                "rowCount": 7,
                "columns": [
                    {"name": "id", "dataType": "int", "isPrimary": true},
                    {"name": "team_id", "dataType": "int", "isForeign": true}
                ]
            }]
        });
        let schema: SchemaDescription = serde_json::from_value(json).unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.row_count_estimate, Some(7));
        assert!(users.column("id").unwrap().is_primary_key);
        assert!(users.column("team_id").unwrap().is_foreign_key);
        assert!(!users.column("team_id").unwrap().is_primary_key);
    }

    #[test]
    fn test_missing_tables_field_is_empty() {
        let schema: SchemaDescription = serde_json::from_str("{}").unwrap();
        assert!(schema.is_empty());
    }
}
