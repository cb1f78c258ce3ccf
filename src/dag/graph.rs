// src/dag/graph.rs

//! The executable graph built from a flow payload.
//!
//! Construction runs, in order: group flattening, payload validation,
//! vertex creation (kind dispatch), edge wiring, derived maps, cycle
//! detection, parameter wiring, shared-model injection and the streaming
//! check. Every structural mutation afterwards goes through
//! [`Graph::refresh_structure`] so the derived maps never drift from the
//! edge set.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::dot::Dot;
use petgraph::graphmap::DiGraphMap;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dag::edge::Edge;
use crate::dag::ledger::DependencyLedger;
use crate::dag::state_store::StateStore;
use crate::dag::vertex::{ParamValue, Vertex, VertexKind, VertexRef, resolve_kind};
use crate::errors::{FlowdagError, Result};
use crate::payload::{FlowPayload, flatten_groups, validate_payload};
use crate::types::{BuildState, VertexId};

/// Counters describing how a graph has been used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphMetadata {
    pub flow_id: Option<String>,
    pub vertices: usize,
    pub edges: usize,
    pub runs: u64,
    pub updates: u64,
}

#[derive(Debug, Clone)]
pub struct Graph {
    vertices: Vec<Vertex>,
    index: HashMap<VertexId, usize>,
    edges: Vec<Edge>,

    predecessor_map: HashMap<VertexId, Vec<VertexId>>,
    successor_map: HashMap<VertexId, Vec<VertexId>>,
    in_degree_map: HashMap<VertexId, usize>,
    /// Direct children of each vertex; used to walk a branch when pruning.
    parent_child_map: HashMap<VertexId, Vec<VertexId>>,

    input_vertices: Vec<VertexId>,
    output_vertices: Vec<VertexId>,
    state_vertices: Vec<VertexId>,
    session_vertices: Vec<VertexId>,

    pub(crate) sorted_layers: Vec<Vec<VertexId>>,
    pub(crate) ledger: DependencyLedger,
    state_store: StateStore,
    run_id: Option<String>,

    config: EngineConfig,
    flow_id: Option<String>,
    runs: u64,
    updates: u64,
}

impl Graph {
    /// Build a graph with the default engine configuration.
    pub fn from_payload(payload: &FlowPayload) -> Result<Self> {
        Self::from_payload_with_config(payload, &EngineConfig::default())
    }

    pub fn from_payload_with_config(payload: &FlowPayload, config: &EngineConfig) -> Result<Self> {
        validate_payload(payload)?;
        let payload = flatten_groups(payload)?;
        validate_payload(&payload)?;

        let vertices: Vec<Vertex> = payload
            .nodes
            .iter()
            .map(|node| {
                let kind = resolve_kind(
                    &node.data.node_type,
                    &node.data.node.template.base_type,
                    &node.id,
                    &config.kinds,
                );
                Vertex::from_descriptor(node, kind, config.build_time_hint(&node.id))
            })
            .collect();

        let index: HashMap<VertexId, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect();

        let mut seen: HashSet<Edge> = HashSet::new();
        let mut edges: Vec<Edge> = Vec::new();
        for descriptor in payload.edges.iter() {
            let edge = Edge::from_descriptor(descriptor, |id| index.contains_key(id))?;
            if seen.insert(edge.clone()) {
                edges.push(edge);
            }
        }

        let mut graph = Self {
            vertices,
            index,
            edges,
            predecessor_map: HashMap::new(),
            successor_map: HashMap::new(),
            in_degree_map: HashMap::new(),
            parent_child_map: HashMap::new(),
            input_vertices: Vec::new(),
            output_vertices: Vec::new(),
            state_vertices: Vec::new(),
            session_vertices: Vec::new(),
            sorted_layers: Vec::new(),
            ledger: DependencyLedger::default(),
            state_store: StateStore::new(),
            run_id: None,
            config: config.clone(),
            flow_id: None,
            runs: 0,
            updates: 0,
        };

        graph.refresh_structure()?;
        graph.validate_stream()?;

        info!(
            vertices = graph.vertices.len(),
            edges = graph.edges.len(),
            "graph built"
        );
        Ok(graph)
    }

    /// Rebuild every derived structure from the current vertices and edges.
    fn refresh_structure(&mut self) -> Result<()> {
        self.index = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect();

        let ids: Vec<VertexId> = self.vertices.iter().map(|v| v.id.clone()).collect();
        let (predecessors, successors) = adjacency(&ids, &self.edges);
        topological_order(&ids, &successors)?;

        self.in_degree_map = predecessors
            .iter()
            .map(|(id, preds)| (id.clone(), preds.len()))
            .collect();
        self.parent_child_map = successors.clone();
        self.predecessor_map = predecessors;
        self.successor_map = successors;

        for vertex in self.vertices.iter_mut() {
            if vertex.frozen && vertex.is_built() {
                continue;
            }
            let id = vertex.id.clone();
            let incoming = self.edges.iter().filter(|e| e.target == id);
            vertex.build_params(incoming);
        }
        self.inject_shared_model();
        self.define_vertex_lists();
        Ok(())
    }

    /// With exactly one model in the graph, every toolkit that does not
    /// name a model gets it wired in as `llm`.
    fn inject_shared_model(&mut self) {
        let models: Vec<VertexId> = self
            .vertices
            .iter()
            .filter(|v| v.kind == VertexKind::Model)
            .map(|v| v.id.clone())
            .collect();
        let [model] = models.as_slice() else {
            return;
        };

        for vertex in self.vertices.iter_mut() {
            if vertex.kind == VertexKind::Toolkit && !vertex.params.contains_key("llm") {
                debug!(vertex = %vertex.id, model = %model, "wiring shared model into toolkit");
                vertex
                    .params
                    .insert("llm".to_string(), ParamValue::Component(model.clone()));
            }
        }
    }

    fn define_vertex_lists(&mut self) {
        let pick = |f: fn(&Vertex) -> bool| -> Vec<VertexId> {
            self.vertices
                .iter()
                .filter(|v| f(v))
                .map(|v| v.id.clone())
                .collect()
        };
        let inputs = pick(Vertex::is_input);
        let outputs = pick(Vertex::is_output);
        let states = pick(Vertex::is_state);
        let sessions = pick(Vertex::has_session_id);

        self.input_vertices = inputs;
        self.output_vertices = outputs;
        self.state_vertices = states;
        self.session_vertices = sessions;
    }

    /// No streaming vertex may reach another streaming vertex.
    fn validate_stream(&self) -> Result<()> {
        for vertex in self.vertices.iter().filter(|v| v.streaming) {
            for succ in self.all_successors(&vertex.id) {
                if self.get_vertex(&succ)?.streaming {
                    return Err(FlowdagError::StreamConflict {
                        first: vertex.id.clone(),
                        second: succ,
                    });
                }
            }
        }
        Ok(())
    }

    // ---- lookups ---------------------------------------------------------

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = &str> {
        self.vertices.iter().map(|v| v.id.as_str())
    }

    pub fn has_vertex(&self, vertex_id: &str) -> bool {
        self.index.contains_key(vertex_id)
    }

    pub fn get_vertex(&self, vertex_id: &str) -> Result<&Vertex> {
        self.index
            .get(vertex_id)
            .map(|&i| &self.vertices[i])
            .ok_or_else(|| FlowdagError::VertexNotFound(vertex_id.to_string()))
    }

    pub fn get_vertex_mut(&mut self, vertex_id: &str) -> Result<&mut Vertex> {
        match self.index.get(vertex_id) {
            Some(&i) => Ok(&mut self.vertices[i]),
            None => Err(FlowdagError::VertexNotFound(vertex_id.to_string())),
        }
    }

    pub fn predecessors(&self, vertex_id: &str) -> &[VertexId] {
        self.predecessor_map
            .get(vertex_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn successors(&self, vertex_id: &str) -> &[VertexId] {
        self.successor_map
            .get(vertex_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn in_degree(&self, vertex_id: &str) -> usize {
        self.in_degree_map.get(vertex_id).copied().unwrap_or(0)
    }

    pub fn predecessor_map(&self) -> &HashMap<VertexId, Vec<VertexId>> {
        &self.predecessor_map
    }

    pub fn successor_map(&self) -> &HashMap<VertexId, Vec<VertexId>> {
        &self.successor_map
    }

    pub fn in_degree_map(&self) -> &HashMap<VertexId, usize> {
        &self.in_degree_map
    }

    pub fn input_vertices(&self) -> &[VertexId] {
        &self.input_vertices
    }

    pub fn output_vertices(&self) -> &[VertexId] {
        &self.output_vertices
    }

    pub fn state_vertices(&self) -> &[VertexId] {
        &self.state_vertices
    }

    pub fn session_vertices(&self) -> &[VertexId] {
        &self.session_vertices
    }

    /// Every vertex reachable from `vertex_id`, excluding itself.
    pub fn all_successors(&self, vertex_id: &str) -> Vec<VertexId> {
        walk(vertex_id, &self.successor_map)
    }

    /// Every vertex that can reach `vertex_id`, excluding itself.
    pub fn all_predecessors(&self, vertex_id: &str) -> Vec<VertexId> {
        walk(vertex_id, &self.predecessor_map)
    }

    /// Vertices in topological order; `DagCycle` if there is none.
    pub fn topological_sort(&self) -> Result<Vec<VertexId>> {
        let ids: Vec<VertexId> = self.vertices.iter().map(|v| v.id.clone()).collect();
        topological_order(&ids, &self.successor_map)
    }

    pub fn metadata(&self) -> GraphMetadata {
        GraphMetadata {
            flow_id: self.flow_id.clone(),
            vertices: self.vertices.len(),
            edges: self.edges.len(),
            runs: self.runs,
            updates: self.updates,
        }
    }

    pub fn set_flow_id(&mut self, flow_id: impl Into<String>) {
        self.flow_id = Some(flow_id.into());
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn increment_run_count(&mut self) {
        self.runs += 1;
    }

    /// Graphviz rendering of the vertices and edges.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraphMap<&str, &str> = DiGraphMap::new();
        for vertex in self.vertices.iter() {
            graph.add_node(vertex.id.as_str());
        }
        for edge in self.edges.iter() {
            graph.add_edge(
                edge.source.as_str(),
                edge.target.as_str(),
                edge.contract.target_input.as_str(),
            );
        }
        format!("{}", Dot::new(&graph))
    }

    // ---- structural updates ---------------------------------------------

    /// Merge a newer definition of the same flow into this graph.
    ///
    /// Vertices missing from `other` are removed, new ones are added, and
    /// vertices whose data or edges changed are replaced. Replaced vertices
    /// lose their result unless frozen.
    pub fn update(&mut self, other: Graph) -> Result<()> {
        let existing: HashSet<VertexId> = self.vertices.iter().map(|v| v.id.clone()).collect();
        let incoming: HashSet<VertexId> = other.vertices.iter().map(|v| v.id.clone()).collect();

        let removed: Vec<VertexId> = existing.difference(&incoming).cloned().collect();
        let added: Vec<VertexId> = incoming.difference(&existing).cloned().collect();

        let touching = |edges: &[Edge], id: &str| -> HashSet<Edge> {
            edges.iter().filter(|e| e.touches(id)).cloned().collect()
        };

        let mut replaced: Vec<VertexId> = Vec::new();
        for new_vertex in other.vertices.iter() {
            let Some(&i) = self.index.get(&new_vertex.id) else {
                continue;
            };
            let old = &self.vertices[i];
            let changed = old.data != new_vertex.data
                || touching(&self.edges, &old.id) != touching(&other.edges, &old.id);
            if changed {
                let mut replacement = new_vertex.clone();
                replacement.carry_over_from(old);
                self.vertices[i] = replacement;
                replaced.push(new_vertex.id.clone());
            }
        }

        self.vertices.retain(|v| !removed.contains(&v.id));
        for id in added.iter() {
            if let Ok(vertex) = other.get_vertex(id) {
                self.vertices.push(vertex.clone());
            }
        }

        // Edges: keep ours where nothing changed, take theirs otherwise.
        let dirty: HashSet<&VertexId> = removed.iter().chain(&added).chain(&replaced).collect();
        let mut edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| !dirty.contains(&e.source) && !dirty.contains(&e.target))
            .cloned()
            .collect();
        for edge in other.edges.iter() {
            let relevant = dirty.contains(&edge.source) || dirty.contains(&edge.target);
            if relevant && !edges.contains(edge) {
                edges.push(edge.clone());
            }
        }
        self.edges = edges;

        self.refresh_structure()?;
        self.validate_stream()?;
        self.updates += 1;

        info!(
            removed = removed.len(),
            added = added.len(),
            replaced = replaced.len(),
            "graph updated"
        );
        Ok(())
    }

    /// Add a vertex together with edges connecting it to the graph.
    ///
    /// Nothing changes if an endpoint is unknown or the edges would close a
    /// cycle.
    pub fn add_vertex(&mut self, vertex: Vertex, edges: Vec<Edge>) -> Result<()> {
        if self.has_vertex(&vertex.id) {
            return Err(FlowdagError::InvalidPayload(format!(
                "duplicate node id '{}'",
                vertex.id
            )));
        }

        let mut ids: Vec<VertexId> = self.vertices.iter().map(|v| v.id.clone()).collect();
        ids.push(vertex.id.clone());
        for edge in edges.iter() {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint) {
                    return Err(FlowdagError::VertexNotFound(endpoint.clone()));
                }
            }
        }

        let mut candidate = self.edges.clone();
        for edge in edges {
            if !candidate.contains(&edge) {
                candidate.push(edge);
            }
        }
        let (_, successors) = adjacency(&ids, &candidate);
        topological_order(&ids, &successors)?;

        debug!(vertex = %vertex.id, "adding vertex");
        self.vertices.push(vertex);
        self.edges = candidate;
        self.refresh_structure()
    }

    /// Remove a vertex and every edge touching it.
    pub fn remove_vertex(&mut self, vertex_id: &str) -> Result<Vertex> {
        let i = *self
            .index
            .get(vertex_id)
            .ok_or_else(|| FlowdagError::VertexNotFound(vertex_id.to_string()))?;

        debug!(vertex = %vertex_id, "removing vertex");
        let vertex = self.vertices.remove(i);
        self.edges.retain(|e| !e.touches(vertex_id));
        self.refresh_structure()?;
        Ok(vertex)
    }

    // ---- run state --------------------------------------------------------

    pub fn run_id(&self) -> Result<&str> {
        self.run_id.as_deref().ok_or(FlowdagError::RunIdNotSet)
    }

    /// Start a new run: state vertices subscribe to their entries.
    pub fn set_run_id(&mut self, run_id: &str) {
        self.run_id = Some(run_id.to_string());
        for id in self.state_vertices.iter() {
            let Some(name) = self.index.get(id).and_then(|&i| self.vertices[i].subscription())
            else {
                warn!(vertex = %id, "state vertex without a name; not subscribed");
                continue;
            };
            self.state_store.subscribe(run_id, id, name);
        }
    }

    /// Drop the state of a finished run.
    pub fn finish_run(&mut self, run_id: &str) {
        self.state_store.remove_run(run_id);
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state_store
    }

    pub fn get_state(&self, name: &str) -> Result<Option<&Value>> {
        let run_id = self.run_id()?;
        Ok(self.state_store.get(run_id, name))
    }

    /// Replace a state entry.
    ///
    /// With a `caller`, every other state vertex subscribed to `name` is
    /// re-armed together with its successors (the caller itself never is).
    /// Returns the re-armed vertices.
    pub fn update_state(
        &mut self,
        name: &str,
        value: Value,
        caller: Option<&str>,
    ) -> Result<Vec<VertexId>> {
        let run_id = self.run_id()?.to_string();
        let subscribers = self.state_store.update(&run_id, name, value);
        Ok(self.activate_state_vertices(subscribers, caller))
    }

    /// Append to a state entry; reactivation as in [`Graph::update_state`].
    pub fn append_state(
        &mut self,
        name: &str,
        value: Value,
        caller: Option<&str>,
    ) -> Result<Vec<VertexId>> {
        let run_id = self.run_id()?.to_string();
        let subscribers = self.state_store.append(&run_id, name, value);
        Ok(self.activate_state_vertices(subscribers, caller))
    }

    fn activate_state_vertices(
        &mut self,
        subscribers: Vec<VertexId>,
        caller: Option<&str>,
    ) -> Vec<VertexId> {
        let Some(caller) = caller else {
            return Vec::new();
        };

        let mut to_rearm: Vec<VertexId> = Vec::new();
        for id in subscribers {
            if id == caller || !self.get_vertex(&id).is_ok_and(Vertex::is_state) {
                continue;
            }
            for v in std::iter::once(id.clone()).chain(self.all_successors(&id)) {
                if v != caller && !to_rearm.contains(&v) {
                    to_rearm.push(v);
                }
            }
        }
        if to_rearm.is_empty() {
            return to_rearm;
        }

        let armed = self
            .ledger
            .reactivate(&to_rearm, self.config.engine.max_reactivations);
        for id in armed.iter() {
            if let Ok(vertex) = self.get_vertex_mut(id) {
                vertex.reset();
            }
        }
        info!(caller, vertices = ?armed, "state change re-armed vertices");
        armed
    }

    /// Mark `vertex_id` and everything below it active or inactive.
    ///
    /// Inactive vertices are never dispatched for the rest of the run.
    pub fn mark_branch(&mut self, vertex_id: &str, active: bool) {
        let mut stack = vec![vertex_id.to_string()];
        let mut visited: HashSet<VertexId> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Ok(vertex) = self.get_vertex_mut(&id) {
                vertex.active = active;
            }
            if !active {
                self.ledger.deactivate(&id);
            }
            if let Some(children) = self.parent_child_map.get(&id) {
                stack.extend(children.iter().cloned());
            }
        }
    }

    /// Clear results before a run; frozen built vertices keep theirs.
    pub(crate) fn reset_for_run(&mut self) {
        for vertex in self.vertices.iter_mut() {
            vertex.reset();
            vertex.active = true;
        }
    }

    pub(crate) fn set_build_state(&mut self, vertex_id: &str, state: BuildState) -> Result<()> {
        self.get_vertex_mut(vertex_id)?.state = state;
        Ok(())
    }

    /// Resolve a vertex's parameters against its predecessors' results.
    ///
    /// A reference to a vertex that has not been built resolves to `null`.
    pub fn resolve_params(&self, vertex_id: &str) -> Result<BTreeMap<String, Value>> {
        let vertex = self.get_vertex(vertex_id)?;
        let mut resolved = BTreeMap::new();
        for (name, param) in vertex.params.iter() {
            let value = match param {
                ParamValue::Value(value) => value.clone(),
                ParamValue::Ref(r) => self.resolve_ref(r)?,
                ParamValue::RefList(refs) => Value::Array(
                    refs.iter()
                        .map(|r| self.resolve_ref(r))
                        .collect::<Result<Vec<_>>>()?,
                ),
                ParamValue::Component(id) => {
                    let component = self.get_vertex(id)?;
                    match &component.result {
                        Some(result) if component.is_built() => result.clone(),
                        _ => component.describe(),
                    }
                }
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    fn resolve_ref(&self, r: &VertexRef) -> Result<Value> {
        let source = self.get_vertex(&r.vertex)?;
        let Some(result) = source.result.as_ref().filter(|_| source.is_built()) else {
            debug!(vertex = %r.vertex, "reference to unbuilt vertex resolves to null");
            return Ok(Value::Null);
        };
        let value = match (&r.output, result) {
            (Some(output), Value::Object(map)) => {
                map.get(output).cloned().unwrap_or_else(|| result.clone())
            }
            _ => result.clone(),
        };
        Ok(value)
    }

    pub(crate) fn record_build(
        &mut self,
        vertex_id: &str,
        result: Value,
        artifacts: Map<String, Value>,
        elapsed: std::time::Duration,
    ) -> Result<()> {
        self.get_vertex_mut(vertex_id)?
            .set_result(result, artifacts, elapsed);
        Ok(())
    }
}

/// Predecessor and successor lists for `ids`, one entry per vertex even
/// when it has no neighbours. Parallel edges between the same pair count
/// once.
fn adjacency(
    ids: &[VertexId],
    edges: &[Edge],
) -> (
    HashMap<VertexId, Vec<VertexId>>,
    HashMap<VertexId, Vec<VertexId>>,
) {
    let mut predecessors: HashMap<VertexId, Vec<VertexId>> =
        ids.iter().map(|id| (id.clone(), Vec::new())).collect();
    let mut successors = predecessors.clone();

    for edge in edges {
        let preds = predecessors.entry(edge.target.clone()).or_default();
        if !preds.contains(&edge.source) {
            preds.push(edge.source.clone());
        }
        let succs = successors.entry(edge.source.clone()).or_default();
        if !succs.contains(&edge.target) {
            succs.push(edge.target.clone());
        }
    }
    (predecessors, successors)
}

fn walk(start: &str, neighbours: &HashMap<VertexId, Vec<VertexId>>) -> Vec<VertexId> {
    let mut out: Vec<VertexId> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut stack: Vec<&str> = vec![start];
    while let Some(id) = stack.pop() {
        for next in neighbours.get(id).into_iter().flatten() {
            if visited.insert(next.as_str()) {
                out.push(next.clone());
                stack.push(next.as_str());
            }
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Three-colour DFS. Returns a topological order or the first cycle found.
fn topological_order(
    ids: &[VertexId],
    successors: &HashMap<VertexId, Vec<VertexId>>,
) -> Result<Vec<VertexId>> {
    let mut marks: HashMap<&str, Mark> = ids.iter().map(|id| (id.as_str(), Mark::Unvisited)).collect();
    let mut order: Vec<VertexId> = Vec::with_capacity(ids.len());

    for root in ids {
        if marks.get(root.as_str()) != Some(&Mark::Unvisited) {
            continue;
        }
        marks.insert(root.as_str(), Mark::InProgress);
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];

        while let Some(&(node, cursor)) = stack.last() {
            let next = successors
                .get(node)
                .and_then(|succs| succs.get(cursor))
                .map(String::as_str);

            let Some(next) = next else {
                marks.insert(node, Mark::Done);
                order.push(node.to_string());
                stack.pop();
                continue;
            };

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match marks.get(next).copied().unwrap_or(Mark::Unvisited) {
                Mark::Unvisited => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, 0));
                }
                Mark::InProgress => {
                    let start = stack.iter().position(|(id, _)| *id == next).unwrap_or(0);
                    let mut path: Vec<&str> = stack[start..].iter().map(|(id, _)| *id).collect();
                    path.push(next);
                    return Err(FlowdagError::DagCycle(path.join(" -> ")));
                }
                Mark::Done => {}
            }
        }
    }

    order.reverse();
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<VertexId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn succ_map(edges: &[(&str, &str)]) -> HashMap<VertexId, Vec<VertexId>> {
        let mut map: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        for (s, t) in edges {
            map.entry(s.to_string()).or_default().push(t.to_string());
        }
        map
    }

    #[test]
    fn topological_order_respects_edges() {
        let order = topological_order(
            &ids(&["C", "B", "A"]),
            &succ_map(&[("A", "B"), ("B", "C"), ("A", "C")]),
        )
        .unwrap();
        let pos = |id: &str| order.iter().position(|v| v == id).unwrap();
        assert!(pos("A") < pos("B"));
        assert!(pos("B") < pos("C"));
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let err = topological_order(
            &ids(&["A", "B", "C"]),
            &succ_map(&[("A", "B"), ("B", "C"), ("C", "A")]),
        )
        .unwrap_err();
        match err {
            FlowdagError::DagCycle(path) => assert_eq!(path, "A -> B -> C -> A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        assert!(topological_order(&ids(&["A"]), &succ_map(&[("A", "A")])).is_err());
    }

    #[test]
    fn walk_excludes_start_and_handles_diamonds() {
        let map = succ_map(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let mut reached = walk("A", &map);
        reached.sort();
        assert_eq!(reached, ids(&["B", "C", "D"]));
    }
}
