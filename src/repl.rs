//! Interactive shell: multi-line SQL terminated by `;`, backslash
//! meta-commands, Ctrl-C to cancel a running statement.

use std::path::{Path, PathBuf};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::runtime::Runtime;

use crate::commands;
use crate::error::Result;
use crate::models::QueryResult;
use crate::render;
use crate::state::AppState;

const HELP: &str = "\
SQL statements end with ';' and may span several lines.

  \\c NAME      switch the active connection
  \\l           list connections
  \\dt          list tables
  \\d TABLE     describe a table
  \\p TABLE     preview the first rows of a table
  \\h [N]       show the last N history entries
  \\s TEXT      search the history
  \\i FILE      run a SQL script
  \\w FILE      save the last statement to a file
  \\o FILE      export the last result (.csv or .xlsx)
  \\f [SQL]     format SQL (default: the last statement)
  \\stats       statistics of the last result
  \\?           this help
  \\q           quit
";

/// Resolves when the user presses Ctrl-C. Never resolves if the signal
/// handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub struct Shell<'a> {
    state: &'a AppState,
    rt: &'a Runtime,
    json: bool,
    history_file: Option<PathBuf>,
    last_sql: Option<String>,
    last_result: Option<QueryResult>,
}

enum Flow {
    Continue,
    Quit,
}

impl<'a> Shell<'a> {
    pub fn new(state: &'a AppState, rt: &'a Runtime, json: bool) -> Self {
        Shell {
            state,
            rt,
            json,
            history_file: None,
            last_sql: None,
            last_result: None,
        }
    }

    /// Keep line-editing history in `path` between sessions
    pub fn with_history_file(mut self, path: PathBuf) -> Self {
        self.history_file = Some(path);
        self
    }

    fn prompt(&self, continuation: bool) -> String {
        if continuation {
            return "   -> ".to_string();
        }
        match self.state.active_connection() {
            Some(name) => format!("{}> ", name),
            None => "sqlman> ".to_string(),
        }
    }

    pub fn run(mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        if let Some(path) = &self.history_file {
            if rl.load_history(path).is_err() {
                log::debug!("No shell history at {}", path.display());
            }
        }

        println!("sqlman {} - type \\? for help, \\q to quit", env!("CARGO_PKG_VERSION"));

        let mut buffer = String::new();
        loop {
            let line = match rl.readline(&self.prompt(!buffer.is_empty())) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    if !buffer.is_empty() {
                        println!("Statement discarded");
                        buffer.clear();
                    }
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if buffer.is_empty() && trimmed.starts_with('\\') {
                let _ = rl.add_history_entry(trimmed);
                match self.meta_command(trimmed) {
                    Flow::Continue => continue,
                    Flow::Quit => break,
                }
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);

            if !trimmed.ends_with(';') {
                if buffer.trim().is_empty() {
                    buffer.clear();
                }
                continue;
            }

            let statement = std::mem::take(&mut buffer);
            let _ = rl.add_history_entry(statement.trim());
            for sql in commands::split_statements(&statement) {
                self.run_statement(&sql);
            }
        }

        if let Some(path) = &self.history_file {
            if let Err(e) = rl.save_history(path) {
                log::warn!("Failed to save shell history: {}", e);
            }
        }
        Ok(())
    }

    fn run_statement(&mut self, sql: &str) {
        let result = self
            .rt
            .block_on(commands::execute_query_until(self.state, sql, None, ctrl_c()));
        self.show(&result);
        self.last_sql = Some(sql.to_string());
        self.last_result = Some(result);
    }

    fn show(&self, result: &QueryResult) {
        if self.json {
            match serde_json::to_string_pretty(result) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("ERROR: {}", e),
            }
        } else {
            print!("{}", render::query_result(result));
        }
    }

    fn meta_command(&mut self, line: &str) -> Flow {
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match (command, arg) {
            ("\\q", _) => return Flow::Quit,
            ("\\?", _) => print!("{}", HELP),
            ("\\l", _) => print!("{}", render::connections(&commands::list_connections(self.state))),
            ("\\c", "") => eprintln!("usage: \\c NAME"),
            ("\\c", name) => match commands::set_active_connection(self.state, name) {
                Ok(()) => println!("Active connection: {}", name),
                Err(e) => eprintln!("ERROR: {}", e),
            },
            ("\\dt", _) => {
                let result = self.rt.block_on(commands::list_tables(self.state, None));
                self.show(&result);
            }
            ("\\d", "") | ("\\p", "") => eprintln!("usage: {} TABLE", command),
            ("\\d", table) => {
                let result = self.rt.block_on(commands::describe_table(self.state, table, None));
                self.show(&result);
            }
            ("\\p", table) => {
                let result = self.rt.block_on(commands::preview_table(self.state, table, None));
                self.show(&result);
                self.last_result = Some(result);
            }
            ("\\h", limit) => {
                let limit = limit.parse().ok();
                print!("{}", render::history(&commands::recent_queries(self.state, limit)));
            }
            ("\\s", "") => eprintln!("usage: \\s TEXT"),
            ("\\s", keyword) => print!("{}", render::history(&commands::search_history(self.state, keyword))),
            ("\\i", "") | ("\\w", "") | ("\\o", "") => eprintln!("usage: {} FILE", command),
            ("\\i", file) => self.run_file(Path::new(file)),
            ("\\w", file) => match &self.last_sql {
                Some(sql) => report(commands::write_sql_file(Path::new(file), &format!("{};\n", sql))),
                None => eprintln!("No statement to save"),
            },
            ("\\o", file) => match &self.last_result {
                Some(result) => {
                    let exported =
                        commands::export_result(result, Path::new(file), None, &self.state.settings.export);
                    match exported {
                        Ok(rows) => {
                            println!("Exported {} row(s) to {}", rows, file);
                            if result.has_more {
                                eprintln!(
                                    "Warning: only {} of {} row(s) were kept; rerun with a higher query.default_limit",
                                    rows, result.total_rows
                                );
                            }
                        }
                        Err(e) => eprintln!("ERROR: {}", e),
                    }
                }
                None => eprintln!("No result to export"),
            },
            ("\\f", "") => match &self.last_sql {
                Some(sql) => println!("{}", commands::format_sql(sql)),
                None => eprintln!("No statement to format"),
            },
            ("\\f", sql) => println!("{}", commands::format_sql(sql)),
            ("\\stats", _) => match &self.last_result {
                Some(result) if result.has_result_set() => print!("{}", render::statistics(&result.statistics())),
                _ => eprintln!("No result set"),
            },
            _ => eprintln!("Unknown command {}; try \\?", command),
        }
        Flow::Continue
    }

    fn run_file(&mut self, path: &Path) {
        let script = match commands::read_sql_file(path) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return;
            }
        };
        for sql in commands::split_statements(&script) {
            self.run_statement(&sql);
        }
    }
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
    }
}
