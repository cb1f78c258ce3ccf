// src/dag/layering.rs

//! Wave assignment for a run.
//!
//! Layers come from a modified Kahn pass, then three refinements are
//! applied in order:
//!
//! 1. push-late: each vertex moves to the layer just before its earliest
//!    successor when that is later than where Kahn put it;
//! 2. cost: within a layer, cheaper vertices (by average build time) first;
//! 3. dependency guard: within a layer, a vertex always precedes its
//!    in-layer successors.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::dag::graph::Graph;
use crate::dag::ledger::DependencyLedger;
use crate::errors::Result;
use crate::types::VertexId;

/// Which part of the graph a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Anchor {
    #[default]
    Whole,
    /// The vertex and everything reachable from it.
    Start(VertexId),
    /// The vertex and everything it depends on.
    Stop(VertexId),
}

impl Graph {
    /// Compute the layers for `anchor`, arm the run's dependency ledger and
    /// return the first wave.
    pub fn sort_vertices(&mut self, anchor: &Anchor) -> Result<Vec<VertexId>> {
        let selected: Vec<VertexId> = match anchor {
            Anchor::Whole => self.vertex_ids().map(str::to_string).collect(),
            Anchor::Start(id) => self.sort_up_to_vertex(id, true)?,
            Anchor::Stop(id) => self.sort_up_to_vertex(id, false)?,
        };

        let layers = self.layered_topological_sort(&selected);
        let layers = self.refine_layers(layers);
        let layers = self.sort_layers_by_build_time(layers);
        let layers = self.sort_layers_by_dependency(layers);

        debug!(?anchor, layers = ?layers, "vertices sorted into layers");

        self.ledger = DependencyLedger::build(
            self.predecessor_map(),
            self.successor_map(),
            layers.iter().flatten().cloned(),
        );
        let first = layers.first().cloned().unwrap_or_default();
        self.sorted_layers = layers;
        Ok(first)
    }

    /// Layers computed by the last [`Graph::sort_vertices`].
    pub fn sorted_layers(&self) -> &[Vec<VertexId>] {
        &self.sorted_layers
    }

    /// The anchor plus its ancestors, or (`is_start`) the anchor plus its
    /// descendants and whatever those descendants depend on, in graph order.
    ///
    /// Ancestors of a start anchor are taken as already provided and stay
    /// out, however far upstream of a descendant they sit.
    pub fn sort_up_to_vertex(&self, vertex_id: &str, is_start: bool) -> Result<Vec<VertexId>> {
        self.get_vertex(vertex_id)?;
        let mut keep: HashSet<VertexId> = HashSet::from([vertex_id.to_string()]);

        if is_start {
            let provided: HashSet<VertexId> = self.all_predecessors(vertex_id).into_iter().collect();
            let mut stack = self.all_successors(vertex_id);
            keep.extend(stack.iter().cloned());
            while let Some(id) = stack.pop() {
                for pred in self.predecessors(&id) {
                    if !provided.contains(pred) && keep.insert(pred.clone()) {
                        debug!(vertex = %pred, for_vertex = %id, "adding upstream dependency to start run");
                        stack.push(pred.clone());
                    }
                }
            }
        } else {
            keep.extend(self.all_predecessors(vertex_id));
        }

        Ok(self
            .vertex_ids()
            .filter(|id| keep.contains(*id))
            .map(str::to_string)
            .collect())
    }

    /// Kahn layering of `vertices`.
    ///
    /// Vertices without predecessors inside the selection seed the first
    /// layer. A vertex still blocked by a predecessor outside the selection
    /// pulls that predecessor into the next layer.
    pub fn layered_topological_sort(&self, vertices: &[VertexId]) -> Vec<Vec<VertexId>> {
        let mut selected: HashSet<VertexId> = vertices.iter().cloned().collect();
        let mut in_degree: HashMap<VertexId, usize> = self.in_degree_map().clone();

        let mut queue: VecDeque<VertexId> = vertices
            .iter()
            .filter(|v| !self.predecessors(v).iter().any(|p| selected.contains(p)))
            .cloned()
            .collect();
        let mut queued: HashSet<VertexId> = queue.iter().cloned().collect();
        let mut layers: Vec<Vec<VertexId>> = Vec::new();

        while !queue.is_empty() {
            let mut layer = Vec::with_capacity(queue.len());
            for _ in 0..queue.len() {
                let Some(vertex_id) = queue.pop_front() else {
                    break;
                };

                for neighbor in self.successors(&vertex_id) {
                    if !selected.contains(neighbor) {
                        continue;
                    }
                    let remaining = in_degree.entry(neighbor.clone()).or_insert(0);
                    *remaining = remaining.saturating_sub(1);

                    if *remaining == 0 {
                        if queued.insert(neighbor.clone()) {
                            queue.push_back(neighbor.clone());
                        }
                        continue;
                    }

                    for pred in self.predecessors(neighbor) {
                        if !selected.contains(pred) && queued.insert(pred.clone()) {
                            debug!(vertex = %pred, for_vertex = %neighbor, "pulling in outside predecessor");
                            selected.insert(pred.clone());
                            queue.push_back(pred.clone());
                        }
                    }
                }
                layer.push(vertex_id);
            }
            layers.push(layer);
        }

        layers
    }

    /// Single push-late pass over `layers`. Empty layers are dropped.
    pub fn refine_layers(&self, layers: Vec<Vec<VertexId>>) -> Vec<Vec<VertexId>> {
        let vertex_to_layer: HashMap<&str, usize> = layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer.iter().map(move |v| (v.as_str(), i)))
            .collect();

        let mut refined: Vec<Vec<VertexId>> = vec![Vec::new(); layers.len()];
        for (layer_index, layer) in layers.iter().enumerate() {
            for vertex_id in layer {
                let preferred = self
                    .successors(vertex_id)
                    .iter()
                    .filter_map(|s| vertex_to_layer.get(s.as_str()))
                    .min()
                    .map(|m| m.saturating_sub(1))
                    .unwrap_or(0);
                refined[preferred.max(layer_index)].push(vertex_id.clone());
            }
        }

        refined.retain(|layer| !layer.is_empty());
        refined
    }

    /// Stable sort of each layer by ascending average build time.
    pub fn sort_layers_by_build_time(&self, mut layers: Vec<Vec<VertexId>>) -> Vec<Vec<VertexId>> {
        for layer in layers.iter_mut() {
            layer.sort_by_key(|id| {
                self.get_vertex(id)
                    .map(|v| v.avg_build_time())
                    .unwrap_or_default()
            });
        }
        layers
    }

    /// Stable sort of each layer so predecessors come before their in-layer
    /// successors.
    pub fn sort_layers_by_dependency(&self, mut layers: Vec<Vec<VertexId>>) -> Vec<Vec<VertexId>> {
        for layer in layers.iter_mut() {
            let members: HashSet<&str> = layer.iter().map(String::as_str).collect();
            let mut heights: HashMap<String, usize> = HashMap::new();
            for id in layer.iter() {
                self.in_layer_height(id, &members, &mut heights);
            }
            layer.sort_by_key(|id| std::cmp::Reverse(heights.get(id).copied().unwrap_or(0)));
        }
        layers
    }

    /// Length of the longest chain of in-layer successors below `id`.
    fn in_layer_height(
        &self,
        id: &str,
        members: &HashSet<&str>,
        memo: &mut HashMap<String, usize>,
    ) -> usize {
        if let Some(&h) = memo.get(id) {
            return h;
        }
        let height = self
            .successors(id)
            .iter()
            .filter(|s| members.contains(s.as_str()))
            .map(|s| self.in_layer_height(s, members, memo) + 1)
            .max()
            .unwrap_or(0);
        memo.insert(id.to_string(), height);
        height
    }
}
