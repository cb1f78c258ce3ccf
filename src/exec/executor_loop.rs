// src/exec/executor_loop.rs

//! Concurrent dispatch of one wave.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::engine::cache::CacheService;
use crate::errors::FlowdagError;
use crate::exec::backend::ComponentCatalog;
use crate::exec::context::BuildContext;
use crate::exec::task_runner::{UnitCompletion, run_unit};
use crate::types::VertexId;

/// What happened to the units of one wave.
#[derive(Debug, Default)]
pub struct WaveOutcome {
    /// Units that finished successfully, in completion order.
    pub completed: Vec<UnitCompletion>,
    /// The first failure, if any.
    pub failure: Option<FlowdagError>,
    /// Units aborted because of the failure.
    pub cancelled: Vec<VertexId>,
}

impl WaveOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Run every unit of a wave concurrently and wait for all of them.
///
/// On the first failure every unit still in flight is aborted and awaited,
/// so nothing from this wave is running once this returns. Units that
/// finished before the abort keep their results.
pub async fn run_wave(
    units: Vec<BuildContext>,
    catalog: Arc<dyn ComponentCatalog>,
    cache: Arc<dyn CacheService>,
) -> WaveOutcome {
    let dispatched: Vec<VertexId> = units.iter().map(|u| u.vertex_id.clone()).collect();
    let mut set = JoinSet::new();
    for ctx in units {
        set.spawn(run_unit(ctx, Arc::clone(&catalog), Arc::clone(&cache)));
    }

    let mut outcome = WaveOutcome::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(done)) => outcome.completed.push(done),
            Ok(Err(err)) => {
                if outcome.failure.is_none() {
                    warn!(error = %err, in_flight = set.len(), "unit failed; cancelling the rest of the wave");
                    set.abort_all();
                    outcome.failure = Some(err);
                }
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                if outcome.failure.is_none() {
                    warn!(error = %join_err, "unit panicked; cancelling the rest of the wave");
                    set.abort_all();
                    outcome.failure = Some(FlowdagError::Other(anyhow!(
                        "build unit panicked: {join_err}"
                    )));
                }
            }
        }
    }

    if let Some(failure) = &outcome.failure {
        let failed = failure.failed_vertex();
        outcome.cancelled = dispatched
            .into_iter()
            .filter(|id| Some(id.as_str()) != failed)
            .filter(|id| !outcome.completed.iter().any(|c| &c.vertex_id == id))
            .collect();
        debug!(cancelled = ?outcome.cancelled, "wave aborted");
    }

    outcome
}
