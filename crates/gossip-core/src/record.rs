// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One exchange an agent witnessed as the receiver: `(sender, receiver,
/// value-after-merge)`. Appended only when the merge actually changed the
/// receiver's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub sender: String,
    pub receiver: String,
    pub data: f64,
}

impl Record {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, data: f64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            data,
        }
    }
}

/// A write-once summary row persisted after a `save(correct)` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub name: String,
    pub max_value: f64,
    pub min_value: f64,
    pub node_count: usize,
    pub decay: f64,
    pub mse: f64,
    pub mean_lost: f64,
    pub mean_round: f64,
}

/// In-memory experiment log, keyed by the record's random name. Read
/// access is grouped by node-count or by decay (formatted to 2 decimals).
#[derive(Debug, Default)]
pub struct ExperimentLog {
    records: DashMap<String, ExperimentRecord>,
}

impl ExperimentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: ExperimentRecord) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn all(&self) -> Vec<ExperimentRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    /// Groups every stored record by its `node_count`, keyed by the plain
    /// decimal string of that count.
    pub fn by_node_count(&self) -> std::collections::HashMap<String, Vec<ExperimentRecord>> {
        let mut out: std::collections::HashMap<String, Vec<ExperimentRecord>> = Default::default();
        for entry in self.records.iter() {
            let r = entry.value();
            out.entry(r.node_count.to_string()).or_default().push(r.clone());
        }
        out
    }

    /// Groups every stored record by `decay`, keyed by `"{:.2}"`.
    pub fn by_decay(&self) -> std::collections::HashMap<String, Vec<ExperimentRecord>> {
        let mut out: std::collections::HashMap<String, Vec<ExperimentRecord>> = Default::default();
        for entry in self.records.iter() {
            let r = entry.value();
            out.entry(format!("{:.2}", r.decay)).or_default().push(r.clone());
        }
        out
    }

    /// Renders the full log as CSV: `headers\nrow1\nrow2\n…`.
    pub fn to_csv(&self) -> String {
        let headers = [
            "name",
            "max_value",
            "min_value",
            "node_count",
            "decay",
            "mse",
            "mean_lost",
            "mean_round",
        ];
        let mut out = headers.join(",");
        out.push('\n');
        for r in self.all() {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                r.name, r.max_value, r.min_value, r.node_count, r.decay, r.mse, r.mean_lost, r.mean_round
            ));
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, node_count: usize, decay: f64) -> ExperimentRecord {
        ExperimentRecord {
            name: name.to_string(),
            max_value: 1.0,
            min_value: 0.0,
            node_count,
            decay,
            mse: 0.0,
            mean_lost: 0.0,
            mean_round: 0.0,
        }
    }

    #[test]
    fn groups_by_node_count() {
        let log = ExperimentLog::new();
        log.add(rec("a", 3, 0.9));
        log.add(rec("b", 3, 0.8));
        log.add(rec("c", 5, 0.9));
        let grouped = log.by_node_count();
        assert_eq!(grouped.get("3").unwrap().len(), 2);
        assert_eq!(grouped.get("5").unwrap().len(), 1);
    }

    #[test]
    fn groups_by_decay_two_decimals() {
        let log = ExperimentLog::new();
        log.add(rec("a", 3, 0.9));
        log.add(rec("b", 3, 0.9001));
        let grouped = log.by_decay();
        assert_eq!(grouped.get("0.90").unwrap().len(), 2);
    }

    #[test]
    fn csv_has_header_and_trimmed_rows() {
        let log = ExperimentLog::new();
        log.add(rec("a", 3, 0.9));
        let csv = log.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,max_value,min_value,node_count,decay,mse,mean_lost,mean_round");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn empty_log_csv_is_header_only() {
        let log = ExperimentLog::new();
        assert_eq!(log.to_csv().lines().count(), 1);
    }
}
