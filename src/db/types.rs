//! Row to JSON conversion for `run_query` results.
//!
//! Column types are first classified into a [`TypeCategory`], then each
//! driver tries a short list of Rust types for that category. The first type
//! sqlx agrees to decode wins; anything undecodable becomes `null`.

use crate::models::{ColumnMetadata, DatabaseType};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Binary,
    Json,
    Text,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity stores floats
        return if db == DatabaseType::SQLite {
            TypeCategory::Float
        } else {
            TypeCategory::Decimal
        };
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }
    if lower.contains("date") || lower.contains("time") {
        return TypeCategory::Temporal;
    }
    TypeCategory::Text
}

/// DECIMAL/NUMERIC kept as the database's own text rendering.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Binary data as UTF-8 text when requested and valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8], decode_binary: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) if decode_binary => JsonValue::String(s.to_string()),
        _ => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Try each listed type in turn; the first one sqlx accepts decides the value.
/// A NULL decodes as `None` under the first type and yields `null`.
macro_rules! first_decodable {
    ($row:expr, $idx:expr, $( $ty:ty => $conv:expr ),+ $(,)?) => {{
        $(
            if let Ok(value) = $row.try_get::<Option<$ty>, _>($idx) {
                return value.map($conv).unwrap_or(JsonValue::Null);
            }
        )+
        JsonValue::Null
    }};
}

pub trait RowToJson {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue>;
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
}

fn column_metadata<R: Row>(row: &R) -> Vec<ColumnMetadata> {
    row.columns()
        .iter()
        .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
        .collect()
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let category = categorize_type(col.type_info().name(), DatabaseType::MySQL);
                let value = mysql::decode_column(self, col.ordinal(), category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let category = categorize_type(col.type_info().name(), DatabaseType::PostgreSQL);
                let value = postgres::decode_column(self, col.ordinal(), category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self, decode_binary: bool) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let category = categorize_type(col.type_info().name(), DatabaseType::SQLite);
                let value = sqlite::decode_column(self, col.ordinal(), category, decode_binary);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }
}

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        match category {
            TypeCategory::Decimal => first_decodable!(row, idx, RawDecimal => |v| JsonValue::String(v.0)),
            TypeCategory::Integer => first_decodable!(row, idx,
                i64 => JsonValue::from,
                u64 => JsonValue::from,
            ),
            TypeCategory::Boolean => first_decodable!(row, idx, bool => JsonValue::Bool),
            TypeCategory::Float => first_decodable!(row, idx,
                f64 => float_value,
                f32 => |v| float_value(v as f64),
            ),
            TypeCategory::Temporal => first_decodable!(row, idx,
                DateTime<Utc> => |v| JsonValue::String(v.to_rfc3339()),
                NaiveDateTime => |v| JsonValue::String(v.to_string()),
                NaiveDate => |v| JsonValue::String(v.to_string()),
                NaiveTime => |v| JsonValue::String(v.to_string()),
                String => JsonValue::String,
            ),
            TypeCategory::Binary => first_decodable!(row, idx,
                Vec<u8> => |v| decode_binary_value(&v, decode_binary),
            ),
            TypeCategory::Json => first_decodable!(row, idx, JsonValue => |v| v),
            TypeCategory::Text => first_decodable!(row, idx,
                String => JsonValue::String,
                // VARBINARY-backed text columns
                Vec<u8> => |v| decode_binary_value(&v, true),
            ),
        }
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        match category {
            TypeCategory::Decimal => first_decodable!(row, idx, RawDecimal => |v| JsonValue::String(v.0)),
            TypeCategory::Integer => first_decodable!(row, idx,
                i64 => JsonValue::from,
                i32 => JsonValue::from,
                i16 => JsonValue::from,
            ),
            TypeCategory::Boolean => first_decodable!(row, idx, bool => JsonValue::Bool),
            TypeCategory::Float => first_decodable!(row, idx,
                f64 => float_value,
                f32 => |v| float_value(v as f64),
            ),
            TypeCategory::Temporal => first_decodable!(row, idx,
                DateTime<Utc> => |v| JsonValue::String(v.to_rfc3339()),
                NaiveDateTime => |v| JsonValue::String(v.to_string()),
                NaiveDate => |v| JsonValue::String(v.to_string()),
                NaiveTime => |v| JsonValue::String(v.to_string()),
            ),
            TypeCategory::Binary => first_decodable!(row, idx,
                Vec<u8> => |v| decode_binary_value(&v, decode_binary),
            ),
            TypeCategory::Json => first_decodable!(row, idx, JsonValue => |v| v),
            TypeCategory::Text => first_decodable!(row, idx, String => JsonValue::String),
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        // Declared types are advisory in SQLite; fall back through the storage classes.
        match category {
            TypeCategory::Integer => first_decodable!(row, idx,
                i64 => JsonValue::from,
                f64 => float_value,
                String => JsonValue::String,
            ),
            TypeCategory::Boolean => first_decodable!(row, idx, bool => JsonValue::Bool),
            TypeCategory::Float | TypeCategory::Decimal => first_decodable!(row, idx,
                f64 => float_value,
                String => JsonValue::String,
            ),
            TypeCategory::Binary => first_decodable!(row, idx,
                Vec<u8> => |v| decode_binary_value(&v, decode_binary),
            ),
            TypeCategory::Json | TypeCategory::Temporal | TypeCategory::Text => {
                first_decodable!(row, idx,
                    String => JsonValue::String,
                    i64 => JsonValue::from,
                    f64 => float_value,
                    Vec<u8> => |v| decode_binary_value(&v, decode_binary),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type() {
        assert_eq!(categorize_type("INT", DatabaseType::MySQL), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGSERIAL", DatabaseType::PostgreSQL), TypeCategory::Integer);
        assert_eq!(categorize_type("BOOLEAN", DatabaseType::SQLite), TypeCategory::Boolean);
        assert_eq!(categorize_type("DOUBLE", DatabaseType::MySQL), TypeCategory::Float);
        assert_eq!(categorize_type("jsonb", DatabaseType::PostgreSQL), TypeCategory::Json);
        assert_eq!(categorize_type("BYTEA", DatabaseType::PostgreSQL), TypeCategory::Binary);
        assert_eq!(categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL), TypeCategory::Temporal);
        assert_eq!(categorize_type("DATETIME", DatabaseType::MySQL), TypeCategory::Temporal);
        assert_eq!(categorize_type("VARCHAR", DatabaseType::MySQL), TypeCategory::Text);
    }

    #[test]
    fn test_categorize_decimal_depends_on_database() {
        assert_eq!(categorize_type("DECIMAL", DatabaseType::MySQL), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC", DatabaseType::PostgreSQL), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC", DatabaseType::SQLite), TypeCategory::Float);
    }

    #[test]
    fn test_decode_binary_value() {
        assert_eq!(
            decode_binary_value(b"hello world", true),
            JsonValue::String("hello world".to_string())
        );
        assert_eq!(
            decode_binary_value(b"hello world", false),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(
            decode_binary_value(&[0xFF, 0xFE, 0x00, 0x01], true),
            JsonValue::String("//4AAQ==".to_string())
        );
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }

    #[tokio::test]
    async fn test_sqlite_row_to_json() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER, name TEXT, score REAL, note TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES (1, 'ada', 9.5, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT id, name, score, note FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        let map = row.to_json_map(false);
        assert_eq!(map["id"], serde_json::json!(1));
        assert_eq!(map["name"], serde_json::json!("ada"));
        assert_eq!(map["score"], serde_json::json!(9.5));
        assert_eq!(map["note"], JsonValue::Null);

        let names: Vec<String> = row.column_metadata().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["id", "name", "score", "note"]);
    }
}
