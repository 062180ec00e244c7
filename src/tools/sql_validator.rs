//! Read-only enforcement for `run_query`.
//!
//! The denylist applied to generated SQL is a coarse text filter. Before
//! anything is executed, the statement is parsed with
//! [sqlparser](https://docs.rs/sqlparser/) in the session's dialect and
//! checked against an allow-list: plain queries, SHOW statements, and
//! EXPLAIN of a plain query. Everything else is refused.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

const NOT_READ_ONLY: &str =
    "run_query only executes read-only statements (SELECT, SHOW, EXPLAIN SELECT)";

fn dialect_for(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Validate SQL for read-only execution.
///
/// ```
/// use nl_sql_server::tools::sql_validator::validate_readonly;
/// use nl_sql_server::models::DatabaseType;
///
/// assert!(validate_readonly("SELECT * FROM users", DatabaseType::PostgreSQL).is_ok());
/// assert!(validate_readonly("DELETE FROM users", DatabaseType::PostgreSQL).is_err());
/// ```
pub fn validate_readonly(sql: &str, db_type: DatabaseType) -> DbResult<()> {
    let dialect = dialect_for(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| DbError::invalid_input(format!("Failed to parse SQL statement: {}", e)))?;

    if statements.is_empty() {
        return Err(DbError::invalid_input("Empty SQL statement"));
    }

    for stmt in &statements {
        if !is_read_only(stmt) {
            return Err(DbError::permission(operation_name(stmt), NOT_READ_ONLY));
        }
    }
    Ok(())
}

fn is_read_only(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => !query_writes(query),
        Statement::Explain { statement, .. } => is_read_only(statement),
        Statement::ExplainTable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. } => true,
        _ => false,
    }
}

/// True when a query body or one of its CTEs modifies data
/// (`SELECT ... INTO`, data-modifying CTEs).
fn query_writes(query: &Query) -> bool {
    let cte_writes = query
        .with
        .as_ref()
        .is_some_and(|with| with.cte_tables.iter().any(|cte| query_writes(&cte.query)));
    cte_writes || set_expr_writes(&query.body)
}

fn set_expr_writes(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(query) => query_writes(query),
        SetExpr::SetOperation { left, right, .. } => set_expr_writes(left) || set_expr_writes(right),
        SetExpr::Values(_) | SetExpr::Table(_) => false,
        // INSERT/UPDATE/DELETE/MERGE bodies
        _ => true,
    }
}

/// Leading keyword of the statement, used to name what was refused.
fn operation_name(stmt: &Statement) -> String {
    let rendered = stmt.to_string();
    let mut words = rendered.split_whitespace();
    match (words.next(), words.next()) {
        (Some(first), Some(second))
            if matches!(
                first.to_ascii_uppercase().as_str(),
                "CREATE" | "DROP" | "ALTER"
            ) =>
        {
            format!("{} {}", first.to_ascii_uppercase(), second.to_ascii_uppercase())
        }
        (Some(first), _) => first.to_ascii_uppercase(),
        _ => "UNKNOWN".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PG: DatabaseType = DatabaseType::PostgreSQL;

    fn refused_operation(sql: &str, db_type: DatabaseType) -> String {
        match validate_readonly(sql, db_type) {
            Err(DbError::Permission { operation, .. }) => operation,
            other => panic!("expected permission error for {sql:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_select_allowed_in_every_dialect() {
        for db in [DatabaseType::PostgreSQL, DatabaseType::MySQL, DatabaseType::SQLite] {
            assert!(validate_readonly("SELECT name FROM users LIMIT 100", db).is_ok());
        }
    }

    #[test]
    fn test_joins_subqueries_and_unions_allowed() {
        let sql = r#"
            SELECT u.name, COUNT(o.id) AS order_count
            FROM users u
            LEFT JOIN orders o ON o.user_id = u.id
            WHERE u.id IN (SELECT user_id FROM active_users)
            GROUP BY u.name
            UNION ALL
            SELECT 'total', COUNT(*) FROM orders
        "#;
        assert!(validate_readonly(sql, PG).is_ok());
    }

    #[test]
    fn test_read_only_cte_allowed() {
        let sql = "WITH recent AS (SELECT * FROM orders WHERE total > 10) SELECT * FROM recent";
        assert!(validate_readonly(sql, PG).is_ok());
    }

    #[test]
    fn test_show_and_explain_allowed() {
        assert!(validate_readonly("SHOW TABLES", DatabaseType::MySQL).is_ok());
        assert!(validate_readonly("EXPLAIN SELECT * FROM users", PG).is_ok());
    }

    #[test]
    fn test_writes_refused() {
        assert_eq!(refused_operation("INSERT INTO users VALUES (1)", PG), "INSERT");
        assert_eq!(refused_operation("UPDATE users SET name = 'x'", PG), "UPDATE");
        assert_eq!(refused_operation("DELETE FROM users", PG), "DELETE");
        assert_eq!(refused_operation("DROP TABLE users", PG), "DROP TABLE");
        assert_eq!(
            refused_operation("CREATE TABLE t (id INT)", PG),
            "CREATE TABLE"
        );
        assert_eq!(
            refused_operation("ALTER TABLE users ADD COLUMN age INT", PG),
            "ALTER TABLE"
        );
    }

    #[test]
    fn test_admin_and_transaction_statements_refused() {
        for sql in [
            "GRANT SELECT ON users TO bob",
            "COMMIT",
            "CALL refresh_stats()",
            "SET search_path TO public",
        ] {
            assert!(
                matches!(validate_readonly(sql, PG), Err(DbError::Permission { .. })),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_explain_of_write_refused() {
        assert!(validate_readonly("EXPLAIN DELETE FROM users", PG).is_err());
    }

    #[test]
    fn test_select_into_refused() {
        assert!(validate_readonly("SELECT * INTO backup FROM users", PG).is_err());
    }

    #[test]
    fn test_data_modifying_cte_refused() {
        let sql = "WITH gone AS (DELETE FROM users RETURNING id) SELECT * FROM gone";
        assert!(validate_readonly(sql, PG).is_err());
    }

    #[test]
    fn test_stacked_statements_refused() {
        assert!(validate_readonly("SELECT 1; DROP TABLE users", PG).is_err());
    }

    #[test]
    fn test_unparseable_sql_is_invalid_input() {
        let err = validate_readonly("SELEC name FROM", PG).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_empty_sql_is_invalid_input() {
        let err = validate_readonly("   ", PG).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }
}
