// src/dag/ledger.rs

//! Per-run dependency ledger.
//!
//! For every vertex of the run it tracks the predecessors that have not
//! completed yet. Waves after the first are derived from it: a vertex is
//! runnable once it is still pending, active, and has no outstanding
//! predecessors.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::VertexId;

#[derive(Debug, Clone, Default)]
pub struct DependencyLedger {
    /// Outstanding predecessors of each vertex, restricted to the run's set.
    run_predecessors: HashMap<VertexId, HashSet<VertexId>>,
    predecessors: HashMap<VertexId, Vec<VertexId>>,
    successors: HashMap<VertexId, Vec<VertexId>>,
    /// Vertices of the run not yet dispatched.
    vertices_to_run: HashSet<VertexId>,
    /// Every vertex that belongs to this run (grows with reactivation).
    run_set: HashSet<VertexId>,
    completed: HashSet<VertexId>,
    inactive: HashSet<VertexId>,
    /// Re-armed vertices waiting to be picked up by the next wave.
    reactivated: Vec<VertexId>,
    reactivation_counts: HashMap<VertexId, usize>,
}

impl DependencyLedger {
    /// Ledger for a run over `vertices`, given the graph's adjacency.
    pub fn build(
        predecessors: &HashMap<VertexId, Vec<VertexId>>,
        successors: &HashMap<VertexId, Vec<VertexId>>,
        vertices: impl IntoIterator<Item = VertexId>,
    ) -> Self {
        let run_set: HashSet<VertexId> = vertices.into_iter().collect();

        let run_predecessors = run_set
            .iter()
            .map(|v| {
                let pending = predecessors
                    .get(v)
                    .map(|preds| {
                        preds
                            .iter()
                            .filter(|p| run_set.contains(*p))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                (v.clone(), pending)
            })
            .collect();

        Self {
            run_predecessors,
            predecessors: predecessors.clone(),
            successors: successors.clone(),
            vertices_to_run: run_set.clone(),
            run_set,
            ..Self::default()
        }
    }

    pub fn contains(&self, vertex_id: &str) -> bool {
        self.run_set.contains(vertex_id)
    }

    pub fn is_completed(&self, vertex_id: &str) -> bool {
        self.completed.contains(vertex_id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &VertexId> {
        self.vertices_to_run.iter()
    }

    /// Still pending, active, and no outstanding predecessors.
    pub fn is_runnable(&self, vertex_id: &str) -> bool {
        self.vertices_to_run.contains(vertex_id)
            && !self.inactive.contains(vertex_id)
            && self
                .run_predecessors
                .get(vertex_id)
                .is_none_or(|preds| preds.is_empty())
    }

    /// The vertex has been handed to a wave.
    pub fn mark_dispatched(&mut self, vertex_id: &str) {
        self.vertices_to_run.remove(vertex_id);
    }

    /// Exclude a vertex from dispatch for the rest of the run.
    pub fn deactivate(&mut self, vertex_id: &str) {
        self.inactive.insert(vertex_id.to_string());
    }

    /// Record that `vertex_id` completed and return the vertices it unblocked.
    ///
    /// A successor that is still blocked may be waiting on a predecessor
    /// that became runnable but was never picked up; such predecessors are
    /// returned as well.
    pub fn next_runnable(&mut self, vertex_id: &str) -> Vec<VertexId> {
        self.completed.insert(vertex_id.to_string());

        let successors = self.successors.get(vertex_id).cloned().unwrap_or_default();
        for succ in &successors {
            if let Some(preds) = self.run_predecessors.get_mut(succ) {
                preds.remove(vertex_id);
            }
        }

        let mut runnable: Vec<VertexId> = Vec::new();
        let push = |id: &VertexId, out: &mut Vec<VertexId>| {
            if !out.contains(id) {
                out.push(id.clone());
            }
        };

        for succ in &successors {
            if self.is_runnable(succ) {
                push(succ, &mut runnable);
            } else if self.vertices_to_run.contains(succ) {
                for pred in self.predecessors.get(succ).into_iter().flatten() {
                    if self.is_runnable(pred) {
                        push(pred, &mut runnable);
                    }
                }
            }
        }

        runnable
    }

    /// Re-arm `vertices` so they run again in this run.
    ///
    /// Each vertex waits again for its predecessors inside the re-armed set
    /// and for any predecessor of the run that is still pending. A vertex
    /// re-armed `max_reactivations` times already is skipped.
    pub fn reactivate(&mut self, vertices: &[VertexId], max_reactivations: usize) -> Vec<VertexId> {
        let mut armed: Vec<VertexId> = Vec::new();
        for id in vertices {
            let count = self.reactivation_counts.entry(id.clone()).or_insert(0);
            if *count >= max_reactivations {
                warn!(
                    vertex = %id,
                    max_reactivations,
                    "reactivation limit reached; vertex not re-armed"
                );
                continue;
            }
            *count += 1;
            if !armed.contains(id) {
                armed.push(id.clone());
            }
        }

        for id in &armed {
            self.run_set.insert(id.clone());
            self.vertices_to_run.insert(id.clone());
            self.completed.remove(id);
        }

        for id in &armed {
            let pending: HashSet<VertexId> = self
                .predecessors
                .get(id)
                .into_iter()
                .flatten()
                .filter(|p| self.run_set.contains(*p) && self.vertices_to_run.contains(*p))
                .cloned()
                .collect();
            debug!(vertex = %id, waiting_on = pending.len(), "vertex re-armed");
            self.run_predecessors.insert(id.clone(), pending);
        }

        // Anything already waiting on a re-armed vertex has to wait again.
        for id in &armed {
            for succ in self.successors.get(id).into_iter().flatten() {
                if self.vertices_to_run.contains(succ) {
                    self.run_predecessors
                        .entry(succ.clone())
                        .or_default()
                        .insert(id.clone());
                }
            }
        }

        self.reactivated.extend(armed.iter().cloned());
        armed
    }

    /// Vertices of the next wave.
    ///
    /// `candidates` are the vertices unblocked by the previous wave; they
    /// are re-checked because state changes may have re-armed their
    /// predecessors. Re-armed vertices that are runnable join them. If
    /// nothing qualifies, any runnable vertex left in the run is swept up.
    pub fn next_wave(&mut self, candidates: Vec<VertexId>) -> Vec<VertexId> {
        let mut wave: Vec<VertexId> = Vec::new();
        let reactivated = std::mem::take(&mut self.reactivated);

        for id in candidates.into_iter().chain(reactivated) {
            if self.is_runnable(&id) && !wave.contains(&id) {
                wave.push(id);
            }
        }

        if wave.is_empty() {
            let mut leftovers: Vec<VertexId> = self
                .vertices_to_run
                .iter()
                .filter(|id| self.is_runnable(id))
                .cloned()
                .collect();
            leftovers.sort();
            if !leftovers.is_empty() {
                debug!(vertices = ?leftovers, "sweeping runnable vertices");
            }
            wave = leftovers;
        }

        wave
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps(edges: &[(&str, &str)]) -> (HashMap<VertexId, Vec<VertexId>>, HashMap<VertexId, Vec<VertexId>>) {
        let mut preds: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        let mut succs: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        for (s, t) in edges {
            succs.entry(s.to_string()).or_default().push(t.to_string());
            preds.entry(t.to_string()).or_default().push(s.to_string());
        }
        (preds, succs)
    }

    fn ids(v: &[&str]) -> Vec<VertexId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn successor_becomes_runnable_after_all_predecessors() {
        let (p, s) = maps(&[("A", "C"), ("B", "C")]);
        let mut ledger = DependencyLedger::build(&p, &s, ids(&["A", "B", "C"]));
        ledger.mark_dispatched("A");
        ledger.mark_dispatched("B");

        assert!(ledger.next_runnable("A").is_empty());
        assert_eq!(ledger.next_runnable("B"), ids(&["C"]));
    }

    #[test]
    fn predecessors_outside_the_run_are_ignored() {
        let (p, s) = maps(&[("X", "B"), ("B", "C")]);
        let ledger = DependencyLedger::build(&p, &s, ids(&["B", "C"]));
        assert!(ledger.is_runnable("B"));
        assert!(!ledger.is_runnable("C"));
    }

    #[test]
    fn blocked_successor_pulls_in_runnable_predecessor() {
        let (p, s) = maps(&[("A", "C"), ("B", "C")]);
        let mut ledger = DependencyLedger::build(&p, &s, ids(&["A", "B", "C"]));
        ledger.mark_dispatched("A");

        // B was never dispatched; completing A surfaces it.
        assert_eq!(ledger.next_runnable("A"), ids(&["B"]));
    }

    #[test]
    fn reactivation_rearms_and_respects_limit() {
        let (p, s) = maps(&[("S", "T")]);
        let mut ledger = DependencyLedger::build(&p, &s, ids(&["S", "T"]));
        for id in ["S", "T"] {
            ledger.mark_dispatched(id);
            ledger.next_runnable(id);
        }

        let armed = ledger.reactivate(&ids(&["S", "T"]), 1);
        assert_eq!(armed, ids(&["S", "T"]));
        assert!(ledger.is_runnable("S"));
        assert!(!ledger.is_runnable("T"));
        assert_eq!(ledger.next_wave(Vec::new()), ids(&["S"]));

        assert!(ledger.reactivate(&ids(&["S"]), 1).is_empty());
    }

    #[test]
    fn inactive_vertices_are_never_runnable() {
        let (p, s) = maps(&[("A", "B")]);
        let mut ledger = DependencyLedger::build(&p, &s, ids(&["A", "B"]));
        ledger.deactivate("B");
        ledger.mark_dispatched("A");
        assert!(ledger.next_runnable("A").is_empty());
        assert!(ledger.next_wave(Vec::new()).is_empty());
    }

    #[test]
    fn next_wave_deduplicates() {
        let (p, s) = maps(&[("A", "C"), ("B", "C")]);
        let mut ledger = DependencyLedger::build(&p, &s, ids(&["A", "B", "C"]));
        ledger.mark_dispatched("A");
        ledger.mark_dispatched("B");
        let mut candidates = ledger.next_runnable("A");
        candidates.extend(ledger.next_runnable("B"));
        candidates.push("C".to_string());
        assert_eq!(ledger.next_wave(candidates), ids(&["C"]));
    }
}
