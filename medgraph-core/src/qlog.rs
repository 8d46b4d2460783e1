// Copyright 2025 Medgraph (https://github.com/medgraph)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-query log buffer.
//!
//! TRAPI responses echo an execution log. `QueryLog` collects entries for
//! one query, forwards each to `tracing`, and tallies per-API outcomes for
//! the execution summary. Clone-cheap: clones share the same buffer.

use crate::trapi::LogEntry;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct ApiTally {
    pub success: u64,
    pub failure: u64,
}

#[derive(Clone, Default)]
pub struct QueryLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    tallies: Arc<DashMap<String, ApiTally>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.push("DEBUG", message.into(), None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push("INFO", message.into(), None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push("WARNING", message.into(), None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push("ERROR", message.into(), None);
    }

    pub fn info_with_data(&self, message: impl Into<String>, data: serde_json::Value) {
        self.push("INFO", message.into(), Some(data));
    }

    fn push(&self, level: &str, message: String, data: Option<serde_json::Value>) {
        match level {
            "DEBUG" => tracing::debug!("{message}"),
            "WARNING" => tracing::warn!("{message}"),
            "ERROR" => tracing::error!("{message}"),
            _ => tracing::info!("{message}"),
        }
        self.entries.lock().push(LogEntry {
            level: level.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            message,
            data,
        });
    }

    pub fn tally_success(&self, api: &str) {
        self.tallies.entry(api.to_string()).or_default().success += 1;
    }

    pub fn tally_failure(&self, api: &str) {
        self.tallies.entry(api.to_string()).or_default().failure += 1;
    }

    pub fn tallies(&self) -> Vec<(String, ApiTally)> {
        let mut out: Vec<(String, ApiTally)> = self
            .tallies
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let log = QueryLog::new();
        let clone = log.clone();
        clone.info("from clone");
        log.warn("from original");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(entries[1].level, "WARNING");
    }

    #[test]
    fn test_tallies_aggregate_per_api() {
        let log = QueryLog::new();
        log.tally_success("CTD API");
        log.tally_success("CTD API");
        log.tally_failure("CTD API");
        log.tally_failure("DGIdb API");

        let tallies = log.tallies();
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].0, "CTD API");
        assert_eq!(tallies[0].1.success, 2);
        assert_eq!(tallies[0].1.failure, 1);
    }
}
