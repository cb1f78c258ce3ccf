// src/exec/context.rs

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::dag::VertexKind;
use crate::types::VertexId;

/// How a state mutation combines with the existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateWrite {
    Update,
    Append,
}

/// A state write requested by a build, applied by the engine once the
/// wave has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMutation {
    pub name: String,
    pub value: Value,
    pub mode: StateWrite,
    /// Whether the writing vertex announces the change, re-arming the other
    /// subscribers of `name`.
    pub notify: bool,
}

/// Everything a component sees while it builds.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub run_id: String,
    pub vertex_id: VertexId,
    pub display_name: String,
    pub kind: VertexKind,
    pub node_type: String,
    /// Parameters resolved against the predecessors' results.
    pub params: BTreeMap<String, Value>,
    pub session_id: Option<String>,
    pub stream: bool,
    state: BTreeMap<String, Value>,
    mutations: Vec<StateMutation>,
    prune_successors: bool,
}

impl BuildContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: impl Into<String>,
        vertex_id: impl Into<VertexId>,
        display_name: impl Into<String>,
        kind: VertexKind,
        node_type: impl Into<String>,
        params: BTreeMap<String, Value>,
        state: BTreeMap<String, Value>,
        stream: bool,
    ) -> Self {
        let session_id = params
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            run_id: run_id.into(),
            vertex_id: vertex_id.into(),
            display_name: display_name.into(),
            kind,
            node_type: node_type.into(),
            params,
            session_id,
            stream,
            state,
            mutations: Vec::new(),
            prune_successors: false,
        }
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Read a state entry. Writes made earlier in this build are visible.
    pub fn get_state(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    /// Replace a state entry and announce it to the other subscribers.
    pub fn update_state(&mut self, name: impl Into<String>, value: Value) {
        self.push_mutation(name.into(), value, StateWrite::Update, true);
    }

    /// Append to a state entry and announce it to the other subscribers.
    pub fn append_state(&mut self, name: impl Into<String>, value: Value) {
        self.push_mutation(name.into(), value, StateWrite::Append, true);
    }

    /// Replace a state entry without re-arming anything.
    pub fn set_state_local(&mut self, name: impl Into<String>, value: Value) {
        self.push_mutation(name.into(), value, StateWrite::Update, false);
    }

    /// Skip every vertex below this one for the rest of the run.
    pub fn prune_successors(&mut self) {
        self.prune_successors = true;
    }

    pub fn finish(self, result: Value) -> BuildOutput {
        self.finish_with_artifacts(result, Map::new())
    }

    pub fn finish_with_artifacts(self, result: Value, artifacts: Map<String, Value>) -> BuildOutput {
        BuildOutput {
            result,
            artifacts,
            state_mutations: self.mutations,
            prune_successors: self.prune_successors,
        }
    }

    fn push_mutation(&mut self, name: String, value: Value, mode: StateWrite, notify: bool) {
        match mode {
            StateWrite::Update => {
                self.state.insert(name.clone(), value.clone());
            }
            StateWrite::Append => match self.state.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value.clone()),
                Some(existing) => {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, value.clone()]);
                }
                None => {
                    self.state.insert(name.clone(), Value::Array(vec![value.clone()]));
                }
            },
        }
        self.mutations.push(StateMutation {
            name,
            value,
            mode,
            notify,
        });
    }
}

/// Result of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub result: Value,
    pub artifacts: Map<String, Value>,
    pub state_mutations: Vec<StateMutation>,
    pub prune_successors: bool,
}

impl BuildOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            artifacts: Map::new(),
            state_mutations: Vec::new(),
            prune_successors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> BuildContext {
        let mut params = BTreeMap::new();
        params.insert("session_id".to_string(), json!("s-1"));
        let mut state = BTreeMap::new();
        state.insert("history".to_string(), json!("first"));
        BuildContext::new("run", "Notify-1", "Notify", VertexKind::State, "Notify", params, state, false)
    }

    #[test]
    fn session_id_is_read_from_params() {
        assert_eq!(ctx().session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn writes_are_visible_to_later_reads_and_recorded() {
        let mut ctx = ctx();
        ctx.append_state("history", json!("second"));
        ctx.set_state_local("scratch", json!(1));

        assert_eq!(ctx.get_state("history"), Some(&json!(["first", "second"])));
        assert_eq!(ctx.get_state("scratch"), Some(&json!(1)));

        let out = ctx.finish(json!("done"));
        assert_eq!(out.state_mutations.len(), 2);
        assert!(out.state_mutations[0].notify);
        assert_eq!(out.state_mutations[0].mode, StateWrite::Append);
        assert!(!out.state_mutations[1].notify);
    }
}
