// src/engine/mod.rs

//! Run orchestration for flowdag.
//!
//! This module ties together:
//! - the graph's layering and dependency ledger
//! - the concurrent wave dispatcher
//! - the run-scoped result cache
//! - the `run` surface that feeds input batches into a graph
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use serde_json::{Map, Value};

use crate::types::VertexId;

/// Summary of one processed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    /// Vertices of each dispatched wave, in dispatch order.
    pub waves: Vec<Vec<VertexId>>,
    /// Vertices whose build completed, in completion order. A vertex
    /// re-armed by a state change appears once per build.
    pub built: Vec<VertexId>,
    /// Frozen vertices that completed without a build.
    pub skipped: Vec<VertexId>,
    /// The run's cache entry as it stood when the run finished.
    pub results: Map<String, Value>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    /// Index of the first wave containing `vertex_id`.
    pub fn wave_of(&self, vertex_id: &str) -> Option<usize> {
        self.waves
            .iter()
            .position(|w| w.iter().any(|v| v == vertex_id))
    }

    /// How many times `vertex_id` was built.
    pub fn build_count(&self, vertex_id: &str) -> usize {
        self.built.iter().filter(|v| *v == vertex_id).count()
    }
}

pub mod cache;
pub mod core;
pub mod event_handlers;
pub mod run;
pub mod runtime;

pub use cache::{CacheService, InMemoryCacheService};
pub use core::{CoreStep, RunCore, WavePlan};
pub use run::{ResultData, RunOutputs, RunRequest};
pub use runtime::Engine;
