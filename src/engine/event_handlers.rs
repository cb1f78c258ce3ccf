// src/engine/event_handlers.rs

//! Handling of wave outcomes for the core.

use tracing::{debug, error};

use crate::dag::Graph;
use crate::errors::{FlowdagError, Result};
use crate::exec::{StateMutation, StateWrite, UnitCompletion};
use crate::types::{BuildState, VertexId};

/// Side effects a completed build asked for, once its result is stored.
#[derive(Debug)]
pub struct BuildEffects {
    pub vertex_id: VertexId,
    pub state_mutations: Vec<StateMutation>,
    pub prune_successors: bool,
}

/// Store the results of completed units on their vertices.
pub fn record_completions(
    graph: &mut Graph,
    completed: Vec<UnitCompletion>,
) -> Result<Vec<BuildEffects>> {
    let mut effects = Vec::with_capacity(completed.len());
    for done in completed {
        let output = done.output;
        graph.record_build(&done.vertex_id, output.result, output.artifacts, done.elapsed)?;
        effects.push(BuildEffects {
            vertex_id: done.vertex_id,
            state_mutations: output.state_mutations,
            prune_successors: output.prune_successors,
        });
    }
    Ok(effects)
}

/// Mark the failed vertex `Errored`, return cancelled ones to `Unbuilt`,
/// and hand back the error that ends the run.
pub fn handle_wave_failure(
    graph: &mut Graph,
    run_id: &str,
    failure: FlowdagError,
    cancelled: &[VertexId],
) -> FlowdagError {
    if let Some(vertex) = failure.failed_vertex() {
        let _ = graph.set_build_state(vertex, BuildState::Errored);
    }
    for id in cancelled {
        let _ = graph.set_build_state(id, BuildState::Unbuilt);
    }
    error!(
        run_id,
        error = %failure,
        cancelled = ?cancelled,
        "wave failed; run aborted"
    );
    failure
}

/// Apply the state writes of one build, in the order they were made.
///
/// Writes flagged `notify` carry the writer as caller and may re-arm other
/// subscribers.
pub fn apply_state_mutations(
    graph: &mut Graph,
    caller: &str,
    mutations: Vec<StateMutation>,
) -> Result<Vec<VertexId>> {
    let mut rearmed = Vec::new();
    for m in mutations {
        let caller = m.notify.then_some(caller);
        let armed = match m.mode {
            StateWrite::Update => graph.update_state(&m.name, m.value, caller)?,
            StateWrite::Append => graph.append_state(&m.name, m.value, caller)?,
        };
        rearmed.extend(armed);
    }
    Ok(rearmed)
}

/// Deactivate every vertex below `vertex_id`.
pub fn prune_below(graph: &mut Graph, vertex_id: &str) {
    let children: Vec<VertexId> = graph.successors(vertex_id).to_vec();
    debug!(vertex = %vertex_id, children = ?children, "pruning branch");
    for child in children {
        graph.mark_branch(&child, false);
    }
}
