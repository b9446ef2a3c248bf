pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod render;
pub mod repl;
pub mod state;

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tokio::runtime::Runtime;

use cli::{Cli, Command, ConfigCommand, ConnectionCommand, ExportArgs};
use commands::StoragePaths;
use db::credentials::{CredentialStore, KeyringStore, MemoryStore};
use db::store;
use error::{Error, Result};
use models::{AppSettings, QueryResult};
use state::AppState;

/// Run the command line front-end
pub fn run(cli: Cli) -> Result<()> {
    // The settings file may not exist yet
    if let Some(Command::Config(ConfigCommand::Init { force })) = &cli.command {
        return init_config(cli.config.as_deref(), *force);
    }

    let settings = commands::load_settings(cli.config.as_deref())?;
    logging::init(&settings.logging, cli.debug)?;
    log::debug!("Settings loaded: {:?}", settings);

    // Commands that never touch a database
    match &cli.command {
        Some(Command::Config(_)) => return print_json(&settings),
        Some(Command::Format { sql, file }) => return format_command(sql.as_deref(), file.as_deref()),
        _ => {}
    }

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let paths = StoragePaths::from_settings(&settings);
    let connections_file = cli.connections.clone().unwrap_or_else(|| paths.connections.clone());

    let credentials: Box<dyn CredentialStore> = if settings.storage.remember_passwords {
        Box::new(KeyringStore)
    } else {
        Box::new(MemoryStore::default())
    };
    let state = AppState::new(settings, credentials);

    // Load passwords into the in-memory cache (single credential store access)
    match state.credentials().load_all() {
        Ok(passwords) => state.init_password_cache(passwords),
        Err(e) => log::warn!("Failed to load stored passwords: {}", e),
    }

    commands::load_connections(&state, &connections_file)?;
    restore_session(&state, &paths);

    if let Err(e) = commands::load_history(&state, &paths.history) {
        log::warn!("Failed to load query history: {}", e);
    }

    let outcome = dispatch(&rt, &state, &cli, &paths, &connections_file);

    if let Err(e) = store::save_active_connection(&paths.session, state.active_connection().as_deref()) {
        log::warn!("Failed to save session: {}", e);
    }
    if let Err(e) = commands::save_history(&state, &paths.history) {
        log::warn!("Failed to save query history: {}", e);
    }
    rt.block_on(commands::close_all_connections(&state));

    outcome
}

fn restore_session(state: &AppState, paths: &StoragePaths) {
    match store::load_active_connection(&paths.session) {
        Ok(Some(name)) => {
            if !state.set_active(&name) {
                log::warn!("Previously active connection {} is no longer saved", name);
            }
        }
        Ok(None) => {}
        Err(e) => log::warn!("Failed to read session: {}", e),
    }
}

fn dispatch(
    rt: &Runtime,
    state: &AppState,
    cli: &Cli,
    paths: &StoragePaths,
    connections_file: &Path,
) -> Result<()> {
    let target = cli.connection.as_deref();

    match &cli.command {
        Some(Command::Connection(command)) => connection_command(rt, state, command, cli.json, connections_file),

        Some(Command::Query { sql, export }) => {
            // A file gets every row, the terminal gets the capped result
            let result = match export.output {
                Some(_) => rt.block_on(commands::execute_query_for_export(state, sql, target)),
                None => rt.block_on(commands::execute_query(state, sql, target)),
            };
            output_result(state, &result, export, cli.json)
        }

        Some(Command::Run { file }) => {
            let results = rt.block_on(commands::run_sql_file(state, file, target))?;
            for result in &results {
                print_result(result, cli.json);
            }
            let failed = results.iter().filter(|r| !r.success).count();
            if failed > 0 {
                return Err(Error::QueryFailed(format!(
                    "{} of {} statement(s) failed",
                    failed,
                    results.len()
                )));
            }
            Ok(())
        }

        Some(Command::Tables) => {
            let result = rt.block_on(commands::list_tables(state, target));
            output_result(state, &result, &ExportArgs::default(), cli.json)
        }

        Some(Command::Describe { table }) => {
            let result = rt.block_on(commands::describe_table(state, table, target));
            output_result(state, &result, &ExportArgs::default(), cli.json)
        }

        Some(Command::Preview { table, export }) => {
            let result = rt.block_on(commands::preview_table(state, table, target));
            output_result(state, &result, export, cli.json)
        }

        Some(Command::History { limit, search, clear }) => {
            if *clear {
                commands::clear_history(state);
                println!("History cleared");
                return Ok(());
            }
            let entries = match search {
                Some(keyword) => commands::search_history(state, keyword),
                None => commands::recent_queries(state, Some(*limit)),
            };
            if cli.json {
                print_json(&entries)
            } else {
                print!("{}", render::history(&entries));
                Ok(())
            }
        }

        Some(Command::Shell) | None => {
            if let Some(name) = target {
                commands::set_active_connection(state, name)?;
            }
            repl::Shell::new(state, rt, cli.json)
                .with_history_file(paths.shell_history.clone())
                .run()
        }

        // Handled before any connection is loaded
        Some(Command::Config(_)) | Some(Command::Format { .. }) => Ok(()),
    }
}

fn connection_command(
    rt: &Runtime,
    state: &AppState,
    command: &ConnectionCommand,
    json: bool,
    connections_file: &Path,
) -> Result<()> {
    match command {
        ConnectionCommand::Add(args) => {
            let info = rt.block_on(commands::add_connection(state, args.clone().into_config()))?;
            commands::save_connections(state, connections_file)?;
            if json {
                print_json(&info)
            } else {
                println!("Added connection {} ({})", info.name, info.target);
                Ok(())
            }
        }
        ConnectionCommand::Remove { name } => {
            rt.block_on(commands::remove_connection(state, name))?;
            commands::save_connections(state, connections_file)?;
            println!("Removed connection {}", name);
            Ok(())
        }
        ConnectionCommand::List => {
            let infos = commands::list_connections(state);
            if json {
                print_json(&infos)
            } else {
                print!("{}", render::connections(&infos));
                Ok(())
            }
        }
        ConnectionCommand::Test(args) => {
            let config = args.clone().into_config();
            let result = rt.block_on(commands::test_connection(&config, &state.settings.database));
            if json {
                print_json(&result)?;
            } else if result.success {
                println!("Connection OK ({} ms)", result.latency_ms.unwrap_or_default());
            }
            match result.error {
                Some(error) if !result.success => Err(Error::Connect(error)),
                _ => Ok(()),
            }
        }
        ConnectionCommand::Use { name } => {
            commands::set_active_connection(state, name)?;
            println!("Active connection: {}", name);
            Ok(())
        }
    }
}

/// Print or export a result; a failed statement becomes the command's error
fn output_result(state: &AppState, result: &QueryResult, export: &ExportArgs, json: bool) -> Result<()> {
    if !result.success {
        if json {
            print_json(result)?;
        }
        return Err(Error::QueryFailed(result.error.clone().unwrap_or_default()));
    }

    match &export.output {
        Some(path) => {
            let rows = commands::export_result(result, path, export.format, &state.settings.export)?;
            println!("Exported {} row(s) to {}", rows, path.display());
            if result.has_more {
                eprintln!("Warning: the result was limited to {} of {} row(s)", rows, result.total_rows);
            }
        }
        None => print_result(result, json),
    }
    Ok(())
}

fn print_result(result: &QueryResult, json: bool) {
    if json {
        if let Err(e) = print_json(result) {
            log::error!("Failed to print result: {}", e);
        }
    } else {
        print!("{}", render::query_result(result));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write a settings file holding the defaults
fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(commands::default_config_path);
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    commands::save_settings(&path, &AppSettings::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn format_command(sql: Option<&str>, file: Option<&Path>) -> Result<()> {
    let text = match (sql, file) {
        (Some(sql), _) => sql.to_string(),
        (None, Some(file)) => commands::read_sql_file(file)?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    println!("{}", commands::format_sql(&text));
    Ok(())
}
