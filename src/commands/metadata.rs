use super::connection::resolve_connection;
use super::query::execute_query;
use crate::db::dialect;
use crate::models::{DatabaseKind, QueryResult};
use crate::state::AppState;

/// Run a catalog query built for the connection's vendor
async fn run_catalog_query(
    state: &AppState,
    connection: Option<&str>,
    build: impl FnOnce(DatabaseKind) -> String,
) -> QueryResult {
    let (name, handle) = match resolve_connection(state, connection).await {
        Ok(resolved) => resolved,
        Err(e) => return QueryResult::failure(e.to_string(), 0),
    };

    let sql = build(handle.kind());
    execute_query(state, &sql, Some(&name)).await
}

/// List the user tables; names are in the first column
pub async fn list_tables(state: &AppState, connection: Option<&str>) -> QueryResult {
    run_catalog_query(state, connection, dialect::list_tables_sql).await
}

/// Table names only. Empty when the listing fails.
pub async fn table_names(state: &AppState, connection: Option<&str>) -> Vec<String> {
    let result = list_tables(state, connection).await;
    if result.success {
        result.first_column_strings()
    } else {
        vec![]
    }
}

/// Column definitions of `table`
pub async fn describe_table(state: &AppState, table: &str, connection: Option<&str>) -> QueryResult {
    run_catalog_query(state, connection, |kind| dialect::describe_table_sql(kind, table)).await
}

/// First `query.preview_limit` rows of `table`
pub async fn preview_table(state: &AppState, table: &str, connection: Option<&str>) -> QueryResult {
    let limit = state.settings.query.preview_limit;
    run_catalog_query(state, connection, |kind| dialect::preview_table_sql(kind, table, limit)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::connection::add_connection;
    use crate::db::credentials::MemoryStore;
    use crate::models::{AppSettings, ConnectionConfig};

    #[tokio::test]
    async fn browses_sqlite_schema() {
        let mut settings = AppSettings::default();
        settings.query.preview_limit = 2;
        let state = AppState::new(settings, Box::new(MemoryStore::default()));
        add_connection(&state, ConnectionConfig::sqlite("mem", ":memory:")).await.unwrap();

        for sql in [
            "CREATE TABLE \"order items\" (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
            "CREATE TABLE customers (id INTEGER)",
            "INSERT INTO \"order items\" (label) VALUES ('a'), ('b'), ('c')",
        ] {
            assert!(execute_query(&state, sql, None).await.success);
        }

        assert_eq!(table_names(&state, None).await, vec!["customers", "order items"]);

        let columns = describe_table(&state, "order items", None).await;
        assert!(columns.success, "{:?}", columns.error);
        // PRAGMA table_info: cid, name, type, notnull, dflt_value, pk
        let names: Vec<String> = columns.rows.iter().map(|r| r[1].as_str().unwrap().to_string()).collect();
        assert_eq!(names, vec!["id", "label"]);

        let preview = preview_table(&state, "order items", None).await;
        assert!(preview.success);
        assert_eq!(preview.rows.len(), 2);
    }

    #[tokio::test]
    async fn unknown_connection_fails() {
        let state = AppState::new(AppSettings::default(), Box::new(MemoryStore::default()));
        let result = list_tables(&state, Some("nope")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("connection not found: nope"));
        assert!(table_names(&state, None).await.is_empty());
    }
}
