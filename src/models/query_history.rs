use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::QueryResult;

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryHistoryEntry {
    pub executed_at: DateTime<Utc>,
    pub sql: String,
    pub connection_name: String,
    pub success: bool,
    pub execution_time_ms: u64,
    pub affected_rows: u64,
    pub error: Option<String>,
}

impl QueryHistoryEntry {
    pub fn from_result(sql: &str, result: &QueryResult, connection_name: &str) -> Self {
        QueryHistoryEntry {
            executed_at: result.executed_at,
            sql: sql.to_string(),
            connection_name: connection_name.to_string(),
            success: result.success,
            execution_time_ms: result.execution_time_ms,
            affected_rows: result.affected_rows,
            error: result.error.clone(),
        }
    }
}

/// Bounded, append-only log of executed statements. The oldest entry is
/// evicted once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct QueryHistory {
    entries: VecDeque<QueryHistoryEntry>,
    capacity: usize,
}

impl Default for QueryHistory {
    fn default() -> Self {
        QueryHistory::with_capacity(DEFAULT_HISTORY_SIZE)
    }
}

impl QueryHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        QueryHistory {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_SIZE)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: QueryHistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn record(&mut self, sql: &str, result: &QueryResult, connection_name: &str) {
        self.push(QueryHistoryEntry::from_result(sql, result, connection_name));
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<QueryHistoryEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries whose SQL contains `keyword`, ignoring case.
    pub fn search(&self, keyword: &str) -> Vec<QueryHistoryEntry> {
        let needle = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.sql.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueryHistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Extend<QueryHistoryEntry> for QueryHistory {
    fn extend<I: IntoIterator<Item = QueryHistoryEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sql: &str) -> QueryHistoryEntry {
        QueryHistoryEntry {
            executed_at: Utc::now(),
            sql: sql.to_string(),
            connection_name: "test".into(),
            success: true,
            execution_time_ms: 1,
            affected_rows: 0,
            error: None,
        }
    }

    #[test]
    fn history_never_exceeds_capacity() {
        let mut history = QueryHistory::default();
        for i in 0..1005 {
            history.push(entry(&format!("SELECT {}", i)));
        }
        assert_eq!(history.len(), 1000);
        // The five oldest were evicted
        assert_eq!(history.entries().next().unwrap().sql, "SELECT 5");
        assert_eq!(history.recent(1)[0].sql, "SELECT 1004");
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let mut history = QueryHistory::with_capacity(10);
        history.extend(["a", "b", "c", "d"].into_iter().map(entry));
        let recent: Vec<String> = history.recent(2).into_iter().map(|e| e.sql).collect();
        assert_eq!(recent, vec!["c", "d"]);
        assert_eq!(history.recent(20).len(), 4);
    }

    #[test]
    fn search_ignores_case() {
        let mut history = QueryHistory::default();
        history.push(entry("SELECT * FROM users"));
        history.push(entry("insert into Orders values (1)"));
        history.push(entry("select 1"));
        assert_eq!(history.search("USERS").len(), 1);
        assert_eq!(history.search("select").len(), 2);
        assert!(history.search("missing").is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut history = QueryHistory::with_capacity(0);
        history.push(entry("a"));
        history.push(entry("b"));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.recent(5)[0].sql, "b");
    }
}
