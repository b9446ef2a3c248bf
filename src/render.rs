//! Plain-text rendering of results for the terminal.

use std::fmt::Write;

use crate::models::{value_to_string, ConnectionInfo, QueryHistoryEntry, QueryResult, ResultStatistics};

/// Longest cell shown before it is cut with an ellipsis
const MAX_CELL_WIDTH: usize = 60;

fn truncate(cell: &str) -> String {
    let cell = cell.replace('\n', " ");
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell;
    }
    let mut cut: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('…');
    cut
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

/// Aligned table with a header rule
pub fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| truncate(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| truncate(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(&headers));
    let _ = writeln!(
        out,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &rows {
        let _ = writeln!(out, "{}", line(row));
    }
    out
}

/// A query result as text: the table for result sets, a status line otherwise
pub fn query_result(result: &QueryResult) -> String {
    if !result.success {
        return format!("ERROR: {}\n", result.error.as_deref().unwrap_or("unknown error"));
    }

    if result.columns.is_empty() {
        return format!(
            "OK, {} row(s) affected ({} ms)\n",
            result.affected_rows, result.execution_time_ms
        );
    }

    let headers: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(value_to_string).collect())
        .collect();

    let mut out = table(&headers, &rows);
    if result.has_more {
        let _ = writeln!(
            out,
            "({} of {} rows shown, {} ms)",
            result.rows.len(),
            result.total_rows,
            result.execution_time_ms
        );
    } else {
        let _ = writeln!(out, "({} row(s), {} ms)", result.rows.len(), result.execution_time_ms);
    }
    out
}

pub fn connections(infos: &[ConnectionInfo]) -> String {
    if infos.is_empty() {
        return "No saved connections\n".to_string();
    }

    let headers: Vec<String> = ["", "name", "type", "target", "status"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = infos
        .iter()
        .map(|info| {
            vec![
                if info.is_active { "*".into() } else { String::new() },
                info.name.clone(),
                info.kind.to_string(),
                info.target.clone(),
                format!("{:?}", info.status).to_lowercase(),
            ]
        })
        .collect();
    table(&headers, &rows)
}

pub fn history(entries: &[QueryHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let status = if entry.success { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "{} [{}] {} {}ms: {}",
            entry.executed_at.format("%Y-%m-%d %H:%M:%S"),
            entry.connection_name,
            status,
            entry.execution_time_ms,
            truncate(&entry.sql)
        );
    }
    out
}

pub fn statistics(stats: &ResultStatistics) -> String {
    let headers: Vec<String> = ["column", "type", "non-null", "distinct", "min", "max", "mean"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = stats
        .columns
        .iter()
        .map(|col| {
            let (min, max, mean) = match col.numeric {
                Some(n) => (n.min.to_string(), n.max.to_string(), format!("{:.3}", n.mean)),
                None => Default::default(),
            };
            vec![
                col.name.clone(),
                col.data_type.clone(),
                col.non_null.to_string(),
                col.distinct.to_string(),
                min,
                max,
                mean,
            ]
        })
        .collect();

    let mut out = format!("{} row(s), {} column(s)\n", stats.row_count, stats.column_count);
    out.push_str(&table(&headers, &rows));
    out
}
