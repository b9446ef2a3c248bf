//! Vendor-specific SQL text: catalog queries, identifier quoting and
//! statement classification.

use crate::models::DatabaseKind;

/// Keywords that open a statement producing a result set.
const ROW_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA", "VALUES", "TABLE",
];

/// Quote an identifier for the given vendor, doubling embedded quote chars.
pub fn quote_identifier(kind: DatabaseKind, name: &str) -> String {
    match kind {
        DatabaseKind::Sqlite | DatabaseKind::Mysql => format!("`{}`", name.replace('`', "``")),
        DatabaseKind::Postgresql => format!("\"{}\"", name.replace('"', "\"\"")),
        DatabaseKind::SqlServer => format!("[{}]", name.replace(']', "]]")),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Query listing the user tables of the current database.
pub fn list_tables_sql(kind: DatabaseKind) -> String {
    match kind {
        DatabaseKind::Mysql => "SHOW TABLES".to_string(),
        DatabaseKind::Postgresql => "SELECT tablename AS table_name FROM pg_tables \
             WHERE schemaname = 'public' ORDER BY tablename"
            .to_string(),
        DatabaseKind::Sqlite => "SELECT name AS table_name FROM sqlite_master \
             WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            .to_string(),
        DatabaseKind::SqlServer => "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME"
            .to_string(),
    }
}

/// Query describing the columns of `table`.
pub fn describe_table_sql(kind: DatabaseKind, table: &str) -> String {
    match kind {
        DatabaseKind::Mysql => format!("DESCRIBE {}", quote_identifier(kind, table)),
        DatabaseKind::Sqlite => format!("PRAGMA table_info({})", quote_identifier(kind, table)),
        DatabaseKind::Postgresql => format!(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns WHERE table_name = {} ORDER BY ordinal_position",
            quote_literal(table)
        ),
        DatabaseKind::SqlServer => format!(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} ORDER BY ORDINAL_POSITION",
            quote_literal(table)
        ),
    }
}

/// Query fetching the first `limit` rows of `table`.
pub fn preview_table_sql(kind: DatabaseKind, table: &str, limit: usize) -> String {
    let table = quote_identifier(kind, table);
    match kind {
        DatabaseKind::SqlServer => format!("SELECT TOP {} * FROM {}", limit, table),
        _ => format!("SELECT * FROM {} LIMIT {}", table, limit),
    }
}

/// Strip leading whitespace and SQL comments.
fn skip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or("");
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map(|i| &rest[i + 2..]).unwrap_or("");
        } else {
            return sql;
        }
    }
}

/// First keyword of the statement, uppercased.
pub fn leading_keyword(sql: &str) -> String {
    skip_leading_comments(sql)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

/// Whether the statement is expected to produce a result set.
pub fn returns_rows(sql: &str) -> bool {
    let keyword = leading_keyword(sql);
    if ROW_KEYWORDS.contains(&keyword.as_str()) {
        return true;
    }
    // INSERT/UPDATE/DELETE ... RETURNING
    matches!(keyword.as_str(), "INSERT" | "UPDATE" | "DELETE")
        && sql.to_uppercase().split_whitespace().any(|w| w == "RETURNING")
}
