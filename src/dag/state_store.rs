// src/dag/state_store.rs

//! Shared key/value state for one run.
//!
//! Entries are partitioned by run id so concurrent runs of the same graph
//! never see each other's writes. State vertices subscribe to a name; a
//! write to that name reports the subscribers so the graph can re-arm them.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::types::VertexId;

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    entries: HashMap<String, BTreeMap<String, Value>>,
    subscriptions: HashMap<String, Vec<(VertexId, String)>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, run_id: &str, name: &str) -> Option<&Value> {
        self.entries.get(run_id).and_then(|run| run.get(name))
    }

    /// All entries of a run, as seen by a build starting now.
    pub fn snapshot(&self, run_id: &str) -> BTreeMap<String, Value> {
        self.entries.get(run_id).cloned().unwrap_or_default()
    }

    /// Replace an entry. Returns the vertices subscribed to `name`.
    pub fn update(&mut self, run_id: &str, name: &str, value: Value) -> Vec<VertexId> {
        debug!(run_id, name, "state update");
        self.entries
            .entry(run_id.to_string())
            .or_default()
            .insert(name.to_string(), value);
        self.subscribers(run_id, name)
    }

    /// Push onto an entry, turning a scalar entry into a list first.
    /// Returns the vertices subscribed to `name`.
    pub fn append(&mut self, run_id: &str, name: &str, value: Value) -> Vec<VertexId> {
        debug!(run_id, name, "state append");
        let run = self.entries.entry(run_id.to_string()).or_default();
        match run.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                run.insert(name.to_string(), Value::Array(vec![value]));
            }
        }
        self.subscribers(run_id, name)
    }

    pub fn subscribe(&mut self, run_id: &str, vertex_id: &str, name: &str) {
        let subs = self.subscriptions.entry(run_id.to_string()).or_default();
        if !subs.iter().any(|(v, n)| v == vertex_id && n == name) {
            subs.push((vertex_id.to_string(), name.to_string()));
        }
    }

    pub fn subscribers(&self, run_id: &str, name: &str) -> Vec<VertexId> {
        self.subscriptions
            .get(run_id)
            .map(|subs| {
                subs.iter()
                    .filter(|(_, n)| n == name)
                    .map(|(v, _)| v.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every entry and subscription of a finished run.
    pub fn remove_run(&mut self, run_id: &str) {
        self.entries.remove(run_id);
        self.subscriptions.remove(run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runs_are_isolated() {
        let mut store = StateStore::new();
        store.update("run-a", "topic", json!("rust"));
        store.update("run-b", "topic", json!("go"));

        assert_eq!(store.get("run-a", "topic"), Some(&json!("rust")));
        assert_eq!(store.get("run-b", "topic"), Some(&json!("go")));

        store.remove_run("run-a");
        assert_eq!(store.get("run-a", "topic"), None);
        assert_eq!(store.get("run-b", "topic"), Some(&json!("go")));
    }

    #[test]
    fn append_wraps_scalars() {
        let mut store = StateStore::new();
        store.append("r", "log", json!(1));
        store.append("r", "log", json!(2));
        store.update("r", "single", json!("a"));
        store.append("r", "single", json!("b"));

        assert_eq!(store.get("r", "log"), Some(&json!([1, 2])));
        assert_eq!(store.get("r", "single"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn writes_report_subscribers_of_that_name_only() {
        let mut store = StateStore::new();
        store.subscribe("r", "Listen-1", "topic");
        store.subscribe("r", "Listen-1", "topic");
        store.subscribe("r", "Listen-2", "other");

        assert_eq!(store.update("r", "topic", json!(1)), vec!["Listen-1".to_string()]);
        assert!(store.update("r", "unrelated", json!(1)).is_empty());
        assert!(store.subscribers("other-run", "topic").is_empty());
    }
}
