//! Command-line definition: global options and subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{ConnectionConfig, DatabaseKind, ExportFormat, SslMode};

/// Multi-database SQL client
#[derive(Parser, Debug)]
#[command(name = "sqlman")]
#[command(version, about = "Connect to SQLite, MySQL and PostgreSQL databases, run SQL and export results")]
pub struct Cli {
    /// Settings file (default: ~/.sql_manager/config.json)
    #[arg(short = 'c', long = "config", env = "SQL_MANAGER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", env = "SQL_MANAGER_DEBUG", global = true)]
    pub debug: bool,

    /// Saved connections file (default: connections.json in the data directory)
    #[arg(long = "connections", value_name = "FILE", global = true)]
    pub connections: Option<PathBuf>,

    /// Connection to use instead of the active one
    #[arg(short = 'C', long = "connection", value_name = "NAME", global = true)]
    pub connection: Option<String>,

    /// Print results as JSON
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage saved connections
    #[command(subcommand)]
    Connection(ConnectionCommand),

    /// Execute one SQL statement
    Query {
        sql: String,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Run every statement of a SQL script
    Run { file: PathBuf },

    /// List the tables of the database
    Tables,

    /// Show the columns of a table
    Describe { table: String },

    /// Show the first rows of a table
    Preview {
        table: String,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Show, search or clear the query history
    History {
        /// Number of entries to show
        #[arg(short = 'n', long = "limit", default_value_t = 20)]
        limit: usize,

        /// Only entries whose SQL contains this text
        #[arg(short = 's', long = "search")]
        search: Option<String>,

        /// Delete every entry
        #[arg(long = "clear", conflicts_with = "search")]
        clear: bool,
    },

    /// Pretty-print SQL from a file or the command line
    Format {
        /// SQL text; read from --file when omitted
        sql: Option<String>,

        #[arg(short = 'f', long = "file", conflicts_with = "sql")]
        file: Option<PathBuf>,
    },

    /// Inspect or create the settings file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Interactive SQL shell (default)
    Shell,
}

#[derive(Subcommand, Debug)]
pub enum ConnectionCommand {
    /// Connect to a database and save it under a name
    Add(ConnectionArgs),

    /// Forget a saved connection and its stored password
    Remove { name: String },

    /// List saved connections
    List,

    /// Check that a database is reachable without saving it
    Test(ConnectionArgs),

    /// Make a saved connection the active one
    Use { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a settings file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long = "force")]
        force: bool,
    },

    /// Print the effective settings
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Name used to refer to the connection
    pub name: String,

    /// Database type: sqlite, mysql, postgresql or sqlserver
    #[arg(short = 't', long = "type", value_parser = parse_kind)]
    pub kind: DatabaseKind,

    #[arg(long = "host")]
    pub host: Option<String>,

    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    #[arg(short = 'u', long = "user")]
    pub username: Option<String>,

    #[arg(long = "password", env = "SQL_MANAGER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database name, or the file path for SQLite
    #[arg(long = "database", visible_alias = "db")]
    pub database: Option<String>,

    /// PostgreSQL SSL mode: disable, prefer or require
    #[arg(long = "ssl-mode", value_parser = parse_ssl_mode)]
    pub ssl_mode: Option<SslMode>,
}

impl ConnectionArgs {
    pub fn into_config(self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password.unwrap_or_default(),
            database: self.database,
            ssl_mode: self.ssl_mode.unwrap_or_default(),
            ..ConnectionConfig::new(self.name, self.kind)
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Save the result to a file instead of printing it
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Export format (csv or xlsx); taken from the file extension by default
    #[arg(long = "format", value_parser = parse_format, requires = "output")]
    pub format: Option<ExportFormat>,
}

fn parse_kind(s: &str) -> Result<DatabaseKind, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

fn parse_ssl_mode(s: &str) -> Result<SslMode, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(s).ok_or_else(|| format!("unknown export format: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_shell_is_the_default() {
        let cli = Cli::parse_from(["sqlman"]);
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_connection_add() {
        let cli = Cli::parse_from([
            "sqlman", "connection", "add", "prod", "--type", "Postgres", "--host", "db", "-u", "app",
            "--password", "secret", "--db", "orders", "--ssl-mode", "require",
        ]);
        let Some(Command::Connection(ConnectionCommand::Add(args))) = cli.command else {
            panic!("expected connection add");
        };
        let config = args.into_config();
        assert_eq!(config.kind, DatabaseKind::Postgresql);
        assert_eq!(config.host.as_deref(), Some("db"));
        assert_eq!(config.password, "secret");
        assert_eq!(config.ssl_mode, SslMode::Require);
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Cli::try_parse_from(["sqlman", "connection", "add", "x", "--type", "oracle"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::parse_from([
            "sqlman", "query", "SELECT 1", "--json", "-C", "local", "-o", "out.xlsx",
        ]);
        assert!(cli.json);
        assert_eq!(cli.connection.as_deref(), Some("local"));
        let Some(Command::Query { sql, export }) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(sql, "SELECT 1");
        assert_eq!(export.output, Some(PathBuf::from("out.xlsx")));
        assert_eq!(export.format, None);
    }

    #[test]
    fn test_format_requires_output() {
        assert!(Cli::try_parse_from(["sqlman", "query", "SELECT 1", "--format", "csv"]).is_err());
    }
}
