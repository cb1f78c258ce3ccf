// src/exec/task_runner.rs

//! One unit of work: build a single vertex and publish its result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::engine::cache::{CacheService, publish_result};
use crate::errors::{FlowdagError, Result};
use crate::exec::backend::ComponentCatalog;
use crate::exec::context::{BuildContext, BuildOutput};
use crate::types::VertexId;

/// A vertex whose unit finished successfully.
#[derive(Debug, Clone)]
pub struct UnitCompletion {
    pub vertex_id: VertexId,
    pub output: BuildOutput,
    pub elapsed: Duration,
}

/// Build one vertex through the catalog, then publish its result into the
/// run's cache entry.
///
/// A failed build becomes `BuildFailed` carrying the full cause chain.
/// Nothing is published for a failed build.
pub async fn run_unit(
    ctx: BuildContext,
    catalog: Arc<dyn ComponentCatalog>,
    cache: Arc<dyn CacheService>,
) -> Result<UnitCompletion> {
    let vertex_id = ctx.vertex_id.clone();
    let display_name = ctx.display_name.clone();
    let run_id = ctx.run_id.clone();

    info!(vertex = %vertex_id, run_id = %run_id, kind = %ctx.kind, "building vertex");
    let started = Instant::now();

    let output = match catalog.build(ctx).await {
        Ok(output) => output,
        Err(err) => {
            let message = format!("{err:#}");
            error!(
                vertex = %vertex_id,
                run_id = %run_id,
                error = %message,
                "vertex build failed"
            );
            return Err(FlowdagError::BuildFailed {
                vertex: vertex_id,
                display_name,
                message,
            });
        }
    };
    let elapsed = started.elapsed();

    publish_result(cache.as_ref(), &run_id, &vertex_id, &output.result).await;

    debug!(
        vertex = %vertex_id,
        run_id = %run_id,
        elapsed_ms = elapsed.as_millis() as u64,
        "vertex built"
    );

    Ok(UnitCompletion {
        vertex_id,
        output,
        elapsed,
    })
}
