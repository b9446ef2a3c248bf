//! End-to-end tests against SQLite databases (in memory and on disk).

use sqlman_lib::commands::*;
use sqlman_lib::db::credentials::MemoryStore;
use sqlman_lib::error::Error;
use sqlman_lib::models::{
    AppSettings, ConnectionConfig, ConnectionStatus, DatabaseKind, ExportFormat,
};
use sqlman_lib::state::AppState;

fn new_state() -> AppState {
    AppState::new(AppSettings::default(), Box::new(MemoryStore::default()))
}

async fn memory_state(name: &str) -> AppState {
    let state = new_state();
    add_connection(&state, ConnectionConfig::sqlite(name, ":memory:"))
        .await
        .expect("in-memory sqlite connects");
    state
}

#[tokio::test]
async fn create_insert_select() {
    let state = memory_state("mem").await;

    let created = execute_query(&state, "CREATE TABLE fruit (id INTEGER PRIMARY KEY, name TEXT, price REAL)", None).await;
    assert!(created.success, "{:?}", created.error);
    assert!(created.columns.is_empty());

    let inserted = execute_query(&state, "INSERT INTO fruit (name, price) VALUES ('Apple', 1.25)", None).await;
    assert!(inserted.success);
    assert_eq!(inserted.affected_rows, 1);
    execute_query(&state, "INSERT INTO fruit (name, price) VALUES ('Pear', NULL)", None).await;

    let selected = execute_query(&state, "  SELECT id, name, price FROM fruit ORDER BY id  ", None).await;
    assert!(selected.success);
    assert_eq!(selected.affected_rows, 2);
    assert_eq!(selected.total_rows, 2);
    assert!(!selected.has_more);

    let names: Vec<&str> = selected.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "price"]);
    assert_eq!(selected.columns[1].data_type, "TEXT");

    let records = selected.records();
    assert_eq!(records[0]["name"], serde_json::json!("Apple"));
    assert_eq!(records[0]["price"], serde_json::json!(1.25));
    assert!(records[1]["price"].is_null());

    // History keeps the trimmed statement text
    let recent = recent_queries(&state, Some(1));
    assert_eq!(recent[0].sql, "SELECT id, name, price FROM fruit ORDER BY id");
    assert_eq!(recent[0].connection_name, "mem");
}

#[tokio::test]
async fn database_errors_are_results_and_recorded() {
    let state = memory_state("mem").await;

    let result = execute_query(&state, "SELEC nonsense", None).await;
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("syntax error"));

    let missing = execute_query(&state, "SELECT * FROM nowhere", None).await;
    assert!(!missing.success);

    let history = recent_queries(&state, None);
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| !e.success && e.error.is_some()));
}

#[tokio::test]
async fn active_connection_follows_registration_and_removal() {
    let state = new_state();
    add_connection(&state, ConnectionConfig::sqlite("beta", ":memory:")).await.unwrap();
    add_connection(&state, ConnectionConfig::sqlite("alpha", ":memory:")).await.unwrap();
    add_connection(&state, ConnectionConfig::sqlite("gamma", ":memory:")).await.unwrap();
    assert_eq!(state.active_connection().as_deref(), Some("beta"));

    // Each connection is its own database
    execute_query(&state, "CREATE TABLE only_in_beta (x INTEGER)", None).await;
    assert_eq!(table_names(&state, None).await, vec!["only_in_beta"]);
    assert!(table_names(&state, Some("gamma")).await.is_empty());

    set_active_connection(&state, "gamma").unwrap();
    assert!(matches!(
        set_active_connection(&state, "delta"),
        Err(Error::ConnectionNotFound(_))
    ));

    let infos = list_connections(&state);
    assert_eq!(infos.len(), 3);
    assert!(infos.iter().all(|i| i.status == ConnectionStatus::Connected));
    assert_eq!(infos.iter().filter(|i| i.is_active).count(), 1);

    remove_connection(&state, "gamma").await.unwrap();
    assert_eq!(state.active_connection().as_deref(), Some("alpha"));
    assert!(matches!(
        remove_connection(&state, "gamma").await,
        Err(Error::ConnectionNotFound(_))
    ));

    close_all_connections(&state).await;
    assert_eq!(state.active_connection(), None);
    let result = execute_query(&state, "SELECT 1", None).await;
    assert_eq!(result.error.as_deref(), Some("no database connection available"));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let state = memory_state("mem").await;
    let err = add_connection(&state, ConnectionConfig::sqlite("mem", ":memory:")).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateConnection(name) if name == "mem"));
}

#[tokio::test]
async fn sql_server_has_no_driver() {
    let state = new_state();
    let config = ConnectionConfig {
        host: Some("localhost".into()),
        database: Some("master".into()),
        ..ConnectionConfig::new("mssql", DatabaseKind::SqlServer)
    };
    let err = add_connection(&state, config.clone()).await.unwrap_err();
    assert!(matches!(err, Error::DriverUnavailable(DatabaseKind::SqlServer)));
    assert!(list_connections(&state).is_empty());

    let tested = test_connection(&config, &AppSettings::default().database).await;
    assert!(!tested.success);
    assert_eq!(tested.latency_ms, None);
}

#[tokio::test]
async fn test_connection_reports_latency_without_registering() {
    let state = new_state();
    let ok = test_connection(&ConnectionConfig::sqlite("t", ":memory:"), &state.settings.database).await;
    assert!(ok.success);
    assert!(ok.latency_ms.is_some());
    assert!(list_connections(&state).is_empty());

    let dir = tempfile::tempdir().unwrap();
    let unreachable = dir.path().join("missing").join("deep").join("db.sqlite");
    let failed = test_connection(
        &ConnectionConfig::sqlite("t", unreachable.to_string_lossy()),
        &state.settings.database,
    )
    .await;
    assert!(!failed.success);
    assert!(failed.error.is_some());
}

#[tokio::test]
async fn saved_connections_reload_lazily_with_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("connections.json");
    let db_path = dir.path().join("app.db");

    let state = new_state();
    add_connection(&state, ConnectionConfig::sqlite("local", db_path.to_string_lossy()))
        .await
        .unwrap();
    execute_query(&state, "CREATE TABLE kept (v TEXT)", None).await;
    execute_query(&state, "INSERT INTO kept VALUES ('still here')", None).await;

    let server = ConnectionConfig {
        host: Some("db.example".into()),
        username: Some("app".into()),
        password: "s3cret".into(),
        database: Some("orders".into()),
        ..ConnectionConfig::new("orders", DatabaseKind::Postgresql)
    };
    state.set_config(server.clone());
    state.update_passwords(|cache| {
        cache.insert("orders".to_string(), "s3cret".to_string());
    });
    save_connections(&state, &file).unwrap();
    assert!(!std::fs::read_to_string(&file).unwrap().contains("s3cret"));
    close_all_connections(&state).await;

    // Without the stored secret the server entry is skipped
    let bare = new_state();
    assert_eq!(load_connections(&bare, &file).unwrap(), 1);

    let restored = new_state();
    restored.init_password_cache(state.passwords());
    assert_eq!(load_connections(&restored, &file).unwrap(), 2);
    assert_eq!(restored.get_config("orders"), Some(server));

    // Not connected until first use
    assert!(!restored.has_handle("local"));
    let rows = execute_query(&restored, "SELECT v FROM kept", Some("local")).await;
    assert!(rows.success, "{:?}", rows.error);
    assert_eq!(rows.first_column_strings(), vec!["still here"]);
    assert!(restored.has_handle("local"));
}

#[tokio::test]
async fn script_run_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("seed.sql");
    write_sql_file(
        &script,
        "-- seed data\nCREATE TABLE t (id INTEGER, label TEXT);\n\
         INSERT INTO t VALUES (1, 'a;b');\n\
         INSERT INTO missing VALUES (0);\n\
         INSERT INTO t VALUES (2, NULL);\n",
    )
    .unwrap();

    let state = memory_state("mem").await;
    let results = run_sql_file(&state, &script, None).await.unwrap();
    let flags: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(flags, vec![true, true, false, true]);

    let preview = preview_table(&state, "t", None).await;
    assert_eq!(preview.rows.len(), 2);

    let csv_path = dir.path().join("t.csv");
    let settings = AppSettings::default().export;
    assert_eq!(export_result(&preview, &csv_path, None, &settings).unwrap(), 2);
    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.trim_start_matches('\u{feff}'), "id,label\n1,a;b\n2,\n");

    let xlsx_path = dir.path().join("t.out");
    export_result(&preview, &xlsx_path, Some(ExportFormat::Xlsx), &settings).unwrap();
    assert!(xlsx_path.exists());

    let failed = execute_query(&state, "SELECT * FROM missing", None).await;
    assert!(matches!(
        export_result(&failed, &csv_path, None, &settings),
        Err(Error::NothingToExport(_))
    ));
}

#[tokio::test]
async fn export_writes_rows_beyond_the_display_limit() {
    let mut settings = AppSettings::default();
    settings.query.default_limit = 2;
    let state = AppState::new(settings, Box::new(MemoryStore::default()));
    add_connection(&state, ConnectionConfig::sqlite("mem", ":memory:")).await.unwrap();

    let sql = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 5) SELECT x FROM n";
    let shown = execute_query(&state, sql, None).await;
    assert_eq!(shown.rows.len(), 2);
    assert!(shown.has_more);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("n.csv");
    let full = execute_query_for_export(&state, sql, None).await;
    assert_eq!(export_result(&full, &path, None, &state.settings.export).unwrap(), 5);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim_start_matches('\u{feff}'), "x\n1\n2\n3\n4\n5\n");
}

#[tokio::test]
async fn empty_select_keeps_its_columns() {
    let state = memory_state("mem").await;
    execute_query(&state, "CREATE TABLE t (id INTEGER, label TEXT)", None).await;

    let result = execute_query(&state, "SELECT id, label FROM t WHERE id > 10", None).await;
    assert!(result.success, "{:?}", result.error);
    assert!(result.rows.is_empty());
    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "label"]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    assert_eq!(export_result(&result, &path, None, &state.settings.export).unwrap(), 0);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim_start_matches('\u{feff}'), "id,label\n");
}
