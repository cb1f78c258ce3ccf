// src/exec/backend.rs

//! Pluggable component catalog.
//!
//! The engine never knows how a component actually builds; it hands a
//! [`BuildContext`] to a `ComponentCatalog` and gets a [`BuildOutput`] back.
//! The binary uses [`PassthroughCatalog`]; tests provide scripted catalogs
//! that record, delay or fail builds.
//!
//! [`PassthroughCatalog`]: crate::exec::PassthroughCatalog

use std::future::Future;
use std::pin::Pin;

use crate::exec::context::{BuildContext, BuildOutput};

/// Future returned by [`ComponentCatalog::build`].
///
/// Builds run on their own Tokio task, so the future owns everything it
/// needs.
pub type BuildFuture = Pin<Box<dyn Future<Output = anyhow::Result<BuildOutput>> + Send + 'static>>;

/// Trait abstracting how a vertex's component is built.
pub trait ComponentCatalog: Send + Sync {
    /// Build the component behind `ctx.vertex_id`.
    ///
    /// The implementation is free to:
    /// - call out to a model or any other service (production)
    /// - sleep, fail or write state on purpose (tests)
    ///
    /// An `Err` fails the whole run; the error's cause chain is kept in the
    /// resulting `BuildFailed`.
    fn build(&self, ctx: BuildContext) -> BuildFuture;
}
