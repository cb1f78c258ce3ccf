// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::dag::{Anchor, Graph};
use crate::engine::RunReport;
use crate::engine::cache::{CacheService, InMemoryCacheService};
use crate::engine::core::{CoreStep, RunCore};
use crate::errors::{FlowdagError, Result};
use crate::exec::{ComponentCatalog, run_wave};

/// Drives runs of a graph and delegates the actual builds to a
/// [`ComponentCatalog`].
///
/// This is the async IO shell around [`RunCore`], which holds all the wave
/// semantics. The shell dispatches each planned wave concurrently and feeds
/// the outcome back into the core.
#[derive(Clone)]
pub struct Engine {
    catalog: Arc<dyn ComponentCatalog>,
    cache: Arc<dyn CacheService>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine with a process-local result cache.
    pub fn new(catalog: Arc<dyn ComponentCatalog>) -> Self {
        Self {
            catalog,
            cache: Arc::new(InMemoryCacheService::new()),
        }
    }

    pub fn with_cache(catalog: Arc<dyn ComponentCatalog>, cache: Arc<dyn CacheService>) -> Self {
        Self { catalog, cache }
    }

    pub fn cache(&self) -> &Arc<dyn CacheService> {
        &self.cache
    }

    /// Execute `graph` (or the part selected by `anchor`) once.
    ///
    /// Waves run strictly one after another; the vertices of a wave build
    /// concurrently. The first failing build aborts the rest of its wave and
    /// ends the run with that error.
    pub async fn process(&self, graph: &mut Graph, anchor: &Anchor) -> Result<RunReport> {
        self.process_with(graph, anchor, false).await
    }

    pub(crate) async fn process_with(
        &self,
        graph: &mut Graph,
        anchor: &Anchor,
        stream: bool,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let (mut core, mut wave) = RunCore::begin(graph, anchor, run_id.clone(), stream)?;

        while !wave.is_empty() {
            let mut plan = match core.plan_wave(graph, wave) {
                Ok(plan) => plan,
                Err(err) => return Err(self.abort(core, graph, err)),
            };
            let units = std::mem::take(&mut plan.units);
            debug!(
                run_id = %core.run_id(),
                vertices = ?plan.vertices,
                units = units.len(),
                "dispatching wave"
            );

            let outcome = run_wave(units, Arc::clone(&self.catalog), Arc::clone(&self.cache)).await;

            match core.complete_wave(graph, plan, outcome) {
                Ok(CoreStep::Dispatch(next)) => wave = next,
                Ok(CoreStep::Done) => break,
                Err(err) => return Err(self.abort(core, graph, err)),
            }
        }

        let mut report = core.finish(graph);
        report.results = self.cache.get(&run_id).unwrap_or_default();
        self.cache.delete(&run_id);
        Ok(report)
    }

    fn abort(&self, core: RunCore, graph: &mut Graph, err: FlowdagError) -> FlowdagError {
        self.cache.delete(core.run_id());
        core.abort(graph, err)
    }
}
