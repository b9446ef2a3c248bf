use std::fs;
use std::path::Path;

use sqlformat::{FormatOptions, QueryParams};

use super::query::execute_batch;
use crate::error::Result;
use crate::models::QueryResult;
use crate::state::AppState;

pub fn read_sql_file(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)?;
    log::debug!("Read {} bytes of SQL from {}", text.len(), path.display());
    Ok(text)
}

pub fn write_sql_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    log::info!("Saved SQL to {}", path.display());
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split a script into statements on `;`, ignoring semicolons inside quotes
/// and comments. Statements are trimmed; blank or comment-only pieces are
/// dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut state = Scan::Code;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                ';' => {
                    if has_code {
                        statements.push(current.trim().to_string());
                    }
                    current.clear();
                    has_code = false;
                    continue;
                }
                '\'' | '"' | '`' => {
                    state = Scan::Quoted(c);
                    has_code = true;
                }
                '-' if chars.peek() == Some(&'-') => state = Scan::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    current.extend(chars.next());
                    state = Scan::BlockComment;
                    continue;
                }
                c if !c.is_whitespace() => has_code = true,
                _ => {}
            },
            // A doubled quote is an escaped quote; the scanner leaves and
            // re-enters the quoted state
            Scan::Quoted(quote) if c == quote => state = Scan::Code,
            Scan::Quoted(_) => {}
            Scan::LineComment if c == '\n' => state = Scan::Code,
            Scan::LineComment => {}
            Scan::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                current.push(c);
                current.extend(chars.next());
                state = Scan::Code;
                continue;
            }
            Scan::BlockComment => {}
        }
        current.push(c);
    }

    if has_code {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Read a script and run every statement in it on the given connection
pub async fn run_sql_file(
    state: &AppState,
    path: &Path,
    connection: Option<&str>,
) -> Result<Vec<QueryResult>> {
    let script = read_sql_file(path)?;
    let statements = split_statements(&script);
    log::info!("Running {} statement(s) from {}", statements.len(), path.display());
    Ok(execute_batch(state, &statements, connection).await)
}

/// Pretty-print SQL with uppercase keywords
pub fn format_sql(sql: &str) -> String {
    let options = FormatOptions {
        uppercase: Some(true),
        ..FormatOptions::default()
    };
    sqlformat::format(sql, &QueryParams::None, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_semicolons() {
        let script = "CREATE TABLE t (a TEXT);\nINSERT INTO t VALUES ('x;y');\n\n  SELECT * FROM t ;";
        assert_eq!(
            split_statements(script),
            vec!["CREATE TABLE t (a TEXT)", "INSERT INTO t VALUES ('x;y')", "SELECT * FROM t"]
        );
    }

    #[test]
    fn ignores_semicolons_in_comments() {
        let script = "-- setup; not a statement\nSELECT 1; /* a; b */ SELECT 2\n-- trailing;";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "-- setup; not a statement\nSELECT 1");
        assert_eq!(statements[1], "/* a; b */ SELECT 2\n-- trailing;");
    }

    #[test]
    fn escaped_quotes_stay_inside_the_literal() {
        let statements = split_statements("SELECT 'it''s; fine'; SELECT \"a;b\" FROM `c;d`");
        assert_eq!(statements, vec!["SELECT 'it''s; fine'", "SELECT \"a;b\" FROM `c;d`"]);
    }

    #[test]
    fn comment_only_script_is_empty() {
        assert!(split_statements("-- nothing here;\n/* ; */ ;;").is_empty());
    }

    #[test]
    fn files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("script.sql");
        write_sql_file(&path, "SELECT 1;\n").unwrap();
        assert_eq!(read_sql_file(&path).unwrap(), "SELECT 1;\n");
    }

    #[test]
    fn formats_with_uppercase_keywords() {
        let formatted = format_sql("select id, name from users where id = 1");
        assert!(formatted.contains("SELECT"));
        assert!(formatted.contains("FROM"));
        assert!(formatted.contains("WHERE"));
        assert!(!formatted.contains("select"));
        assert!(formatted.lines().count() > 1);
    }
}
