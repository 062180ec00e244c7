//! Schema introspection.
//!
//! Builds a [`SchemaDescription`] from a live session: base tables in name
//! order, columns in ordinal order, primary/foreign key flags and a row count
//! estimate. Views and system tables are left out.
//!
//! # Architecture
//!
//! SQL lives in the `queries` submodule. Each database submodule exposes the
//! same `introspect` function over its own pool type.

use crate::db::pool::DbPool;
use crate::error::DbResult;
use crate::models::{ColumnDescription, SchemaDescription, TableDescription};
use std::collections::HashMap;
use tracing::debug;

/// PostgreSQL schema searched for tables.
pub const POSTGRES_SCHEMA: &str = "public";

pub struct SchemaInspector;

impl SchemaInspector {
    /// Introspect the session's database. Always hits the catalog; nothing is cached.
    pub async fn introspect(pool: &DbPool) -> DbResult<SchemaDescription> {
        let schema = match pool {
            DbPool::Postgres(p) => postgres::introspect(p, POSTGRES_SCHEMA).await?,
            DbPool::MySql(p) => mysql::introspect(p).await?,
            DbPool::SQLite(p) => sqlite::introspect(p).await?,
        };
        debug!(
            db_type = %pool.db_type(),
            tables = schema.tables.len(),
            "Introspected schema"
        );
        Ok(schema)
    }
}

/// Column row shared by the catalog-driven databases.
struct CatalogColumn {
    table_name: String,
    column: ColumnDescription,
}

/// Attach columns to their tables, keeping table order and column order.
fn assemble(tables: Vec<TableDescription>, columns: Vec<CatalogColumn>) -> SchemaDescription {
    let mut tables = tables;
    let positions: HashMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.clone(), i))
        .collect();

    for CatalogColumn { table_name, column } in columns {
        // Columns of views or tables created mid-introspection have no slot.
        if let Some(&i) = positions.get(&table_name) {
            tables[i].columns.push(column);
        }
    }
    SchemaDescription::new(tables)
}

/// Quote an identifier for SQLite, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

mod queries {
    pub mod postgres {
        pub const TABLES: &str = r#"
            SELECT
                t.table_name::text AS table_name,
                s.n_live_tup AS row_count
            FROM information_schema.tables t
            LEFT JOIN pg_stat_user_tables s
                ON s.schemaname = t.table_schema AND s.relname = t.table_name
            WHERE t.table_schema = $1
            AND t.table_type = 'BASE TABLE'
            ORDER BY t.table_name
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                        AND tc.table_name = kcu.table_name
                    WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
                ) AS is_primary_key,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                        AND tc.table_name = kcu.table_name
                    WHERE tc.constraint_type = 'FOREIGN KEY'
                    AND tc.table_schema = c.table_schema
                    AND tc.table_name = c.table_name
                    AND kcu.column_name = c.column_name
                ) AS is_foreign_key
            FROM information_schema.columns c
            WHERE c.table_schema = $1
            ORDER BY c.table_name, c.ordinal_position
            "#;
    }

    pub mod mysql {
        pub const TABLES: &str = r#"
            SELECT
                CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
                TABLE_ROWS AS ROW_COUNT
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                CONVERT(c.TABLE_NAME USING utf8mb4) AS TABLE_NAME,
                CONVERT(c.COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                CONVERT(c.DATA_TYPE USING utf8mb4) AS DATA_TYPE,
                CONVERT(c.COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
                EXISTS (
                    SELECT 1
                    FROM information_schema.KEY_COLUMN_USAGE k
                    WHERE k.TABLE_SCHEMA = c.TABLE_SCHEMA
                    AND k.TABLE_NAME = c.TABLE_NAME
                    AND k.COLUMN_NAME = c.COLUMN_NAME
                    AND k.REFERENCED_TABLE_NAME IS NOT NULL
                ) AS IS_FOREIGN
            FROM information_schema.COLUMNS c
            WHERE c.TABLE_SCHEMA = DATABASE()
            ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn introspect(pool: &PgPool, schema_name: &str) -> DbResult<SchemaDescription> {
        let table_rows = sqlx::query(queries::postgres::TABLES)
            .bind(schema_name)
            .fetch_all(pool)
            .await?;

        let tables = table_rows
            .iter()
            .map(|row| {
                let name: String = row.get("table_name");
                let row_count: Option<i64> = row.try_get("row_count").ok().flatten();
                let table = TableDescription::new(name);
                match row_count {
                    Some(n) => table.with_row_count(n.max(0) as u64),
                    None => table,
                }
            })
            .collect();

        let column_rows = sqlx::query(queries::postgres::COLUMNS)
            .bind(schema_name)
            .fetch_all(pool)
            .await?;

        let columns = column_rows
            .iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let data_type: String = row.get("data_type");
                let mut column = ColumnDescription::new(name, data_type);
                column.is_primary_key = row.try_get("is_primary_key").unwrap_or(false);
                column.is_foreign_key = row.try_get("is_foreign_key").unwrap_or(false);
                CatalogColumn {
                    table_name: row.get("table_name"),
                    column,
                }
            })
            .collect();

        Ok(assemble(tables, columns))
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlPool, Row};

    /// MySQL 5.x may return BIGINT, 8.x BIGINT UNSIGNED.
    fn try_get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
            return Some(v);
        }
        row.try_get::<Option<i64>, _>(column)
            .ok()
            .flatten()
            .map(|v| v.max(0) as u64)
    }

    /// information_schema may come back as VARBINARY depending on charset settings.
    fn get_string(row: &MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    fn get_flag(row: &MySqlRow, column: &str) -> bool {
        row.try_get::<i64, _>(column)
            .map(|v| v != 0)
            .or_else(|_| row.try_get::<bool, _>(column))
            .unwrap_or(false)
    }

    pub async fn introspect(pool: &MySqlPool) -> DbResult<SchemaDescription> {
        let table_rows = sqlx::query(queries::mysql::TABLES)
            .fetch_all(pool)
            .await?;

        let tables = table_rows
            .iter()
            .map(|row| {
                let table = TableDescription::new(get_string(row, "TABLE_NAME"));
                match try_get_u64(row, "ROW_COUNT") {
                    Some(n) => table.with_row_count(n),
                    None => table,
                }
            })
            .collect();

        let column_rows = sqlx::query(queries::mysql::COLUMNS)
            .fetch_all(pool)
            .await?;

        let columns = column_rows
            .iter()
            .map(|row| {
                let mut column = ColumnDescription::new(
                    get_string(row, "COLUMN_NAME"),
                    get_string(row, "DATA_TYPE"),
                );
                column.is_primary_key = get_string(row, "COLUMN_KEY") == "PRI";
                column.is_foreign_key = get_flag(row, "IS_FOREIGN");
                CatalogColumn {
                    table_name: get_string(row, "TABLE_NAME"),
                    column,
                }
            })
            .collect();

        Ok(assemble(tables, columns))
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};
    use std::collections::HashSet;

    pub async fn introspect(pool: &SqlitePool) -> DbResult<SchemaDescription> {
        let names: Vec<String> = sqlx::query(queries::sqlite::TABLES)
            .fetch_all(pool)
            .await?
            .iter()
            .map(|row| row.get("name"))
            .collect();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let foreign = fetch_foreign_key_columns(pool, &name).await?;
            let row_count = count_rows(pool, &name).await?;
            let mut table = TableDescription::new(&name).with_row_count(row_count);
            table.columns = fetch_columns(pool, &name, &foreign).await?;
            tables.push(table);
        }

        Ok(SchemaDescription::new(tables))
    }

    async fn fetch_columns(
        pool: &SqlitePool,
        table_name: &str,
        foreign: &HashSet<String>,
    ) -> DbResult<Vec<ColumnDescription>> {
        let pragma = format!("PRAGMA table_info({})", quote_ident(table_name));
        let rows = sqlx::query(&pragma).fetch_all(pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.try_get("type").unwrap_or_default();
                let pk: i64 = row.try_get("pk").unwrap_or(0);
                let mut column = ColumnDescription::new(&name, data_type);
                column.is_primary_key = pk > 0;
                column.is_foreign_key = foreign.contains(&name);
                column
            })
            .collect())
    }

    async fn fetch_foreign_key_columns(
        pool: &SqlitePool,
        table_name: &str,
    ) -> DbResult<HashSet<String>> {
        let pragma = format!("PRAGMA foreign_key_list({})", quote_ident(table_name));
        let rows = sqlx::query(&pragma).fetch_all(pool).await?;
        Ok(rows.iter().map(|row| row.get::<String, _>("from")).collect())
    }

    // SQLite keeps no statistics by default, so the estimate is an exact count.
    async fn count_rows(pool: &SqlitePool, table_name: &str) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table_name));
        let count = sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?;
        Ok(count.max(0) as u64)
    }
}
