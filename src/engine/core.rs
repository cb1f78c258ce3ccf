// src/engine/core.rs

//! Pure core of a run.
//!
//! `RunCore` turns the graph's layers and dependency ledger into waves:
//! - [`RunCore::begin`] resets the graph, sorts it and returns the first wave;
//! - [`RunCore::plan_wave`] resolves parameters for each vertex of a wave;
//! - [`RunCore::complete_wave`] folds a wave's outcome back into the graph
//!   and decides what runs next.
//!
//! It performs no IO and never awaits; the async shell in
//! [`runtime`](crate::engine::runtime) does the dispatching.

use tracing::{debug, info};

use crate::dag::{Anchor, Graph};
use crate::engine::RunReport;
use crate::engine::event_handlers::{
    apply_state_mutations, handle_wave_failure, prune_below, record_completions,
};
use crate::errors::{FlowdagError, Result};
use crate::exec::{BuildContext, WaveOutcome};
use crate::types::{BuildState, VertexId};

/// Decision returned by the core after a wave has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreStep {
    /// Dispatch these vertices as the next wave.
    Dispatch(Vec<VertexId>),
    /// Nothing left to run.
    Done,
}

/// The units to launch for one wave.
#[derive(Debug)]
pub struct WavePlan {
    pub vertices: Vec<VertexId>,
    pub units: Vec<BuildContext>,
    /// Frozen vertices already built; complete without a build.
    pub skipped: Vec<VertexId>,
}

#[derive(Debug)]
pub struct RunCore {
    run_id: String,
    stream: bool,
    report: RunReport,
}

impl RunCore {
    /// Start a run on `graph`. Returns the core and the first wave.
    pub fn begin(
        graph: &mut Graph,
        anchor: &Anchor,
        run_id: impl Into<String>,
        stream: bool,
    ) -> Result<(Self, Vec<VertexId>)> {
        let run_id = run_id.into();
        graph.reset_for_run();
        let first = graph.sort_vertices(anchor)?;
        graph.set_run_id(&run_id);

        info!(
            run_id = %run_id,
            layers = graph.sorted_layers().len(),
            first_wave = ?first,
            "run started"
        );

        let core = Self {
            report: RunReport::new(run_id.clone()),
            run_id,
            stream,
        };
        Ok((core, first))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Resolve parameters and state for each vertex of `wave`.
    pub fn plan_wave(&mut self, graph: &mut Graph, wave: Vec<VertexId>) -> Result<WavePlan> {
        let mut units = Vec::with_capacity(wave.len());
        let mut skipped = Vec::new();

        for id in wave.iter() {
            graph.ledger.mark_dispatched(id);

            let vertex = graph.get_vertex(id)?;
            if vertex.frozen && vertex.is_built() {
                debug!(vertex = %id, run_id = %self.run_id, "frozen vertex already built; skipping");
                skipped.push(id.clone());
                continue;
            }

            let ctx = BuildContext::new(
                self.run_id.clone(),
                id.clone(),
                vertex.display_name.clone(),
                vertex.kind,
                vertex.node_type(),
                graph.resolve_params(id)?,
                graph.state_store().snapshot(&self.run_id),
                self.stream,
            );
            graph.set_build_state(id, BuildState::Building)?;
            units.push(ctx);
        }

        self.report.waves.push(wave.clone());
        self.report.skipped.extend(skipped.iter().cloned());
        Ok(WavePlan {
            vertices: wave,
            units,
            skipped,
        })
    }

    /// Fold a finished wave back into the graph.
    ///
    /// A failed wave ends the run with its first error. Otherwise the next
    /// wave is made of the vertices the wave unblocked, plus anything its
    /// state writes re-armed.
    pub fn complete_wave(
        &mut self,
        graph: &mut Graph,
        plan: WavePlan,
        outcome: WaveOutcome,
    ) -> Result<CoreStep> {
        let WaveOutcome {
            completed,
            failure,
            cancelled,
        } = outcome;

        let effects = record_completions(graph, completed)?;
        self.report
            .built
            .extend(effects.iter().map(|e| e.vertex_id.clone()));

        if let Some(failure) = failure {
            return Err(handle_wave_failure(graph, &self.run_id, failure, &cancelled));
        }

        let mut candidates: Vec<VertexId> = Vec::new();
        let finished = plan
            .skipped
            .iter()
            .chain(effects.iter().map(|e| &e.vertex_id));
        for id in finished {
            for next in graph.ledger.next_runnable(id) {
                if !candidates.contains(&next) {
                    candidates.push(next);
                }
            }
        }

        for effect in effects {
            if effect.prune_successors {
                prune_below(graph, &effect.vertex_id);
            }
            apply_state_mutations(graph, &effect.vertex_id, effect.state_mutations)?;
        }

        let next = graph.ledger.next_wave(candidates);
        if next.is_empty() {
            Ok(CoreStep::Done)
        } else {
            Ok(CoreStep::Dispatch(next))
        }
    }

    /// Tear down a run that ended with `err`: vertices left mid-build go
    /// back to unbuilt and the run's state partition is dropped.
    pub fn abort(self, graph: &mut Graph, err: FlowdagError) -> FlowdagError {
        let stuck: Vec<VertexId> = graph
            .vertices()
            .iter()
            .filter(|v| v.state == BuildState::Building)
            .map(|v| v.id.clone())
            .collect();
        for id in stuck.iter() {
            let _ = graph.set_build_state(id, BuildState::Unbuilt);
        }
        graph.finish_run(&self.run_id);
        debug!(run_id = %self.run_id, reset = ?stuck, "run torn down after error");
        err
    }

    /// Close the run and hand back its report.
    pub fn finish(self, graph: &mut Graph) -> RunReport {
        graph.increment_run_count();
        graph.finish_run(&self.run_id);
        info!(
            run_id = %self.run_id,
            waves = self.report.waves.len(),
            built = self.report.built.len(),
            "run finished"
        );
        self.report
    }
}
