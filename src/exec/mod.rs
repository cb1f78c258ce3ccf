// src/exec/mod.rs

//! Build execution layer.
//!
//! This module is responsible for actually building vertices through a
//! [`ComponentCatalog`] and reporting the outcome back to the engine.
//!
//! - [`backend`] provides the `ComponentCatalog` trait the engine builds
//!   through, which tests replace with scripted fakes.
//! - [`context`] holds what a build sees (`BuildContext`) and returns
//!   (`BuildOutput`).
//! - [`task_runner`] runs a single unit of work.
//! - [`executor_loop`] dispatches a wave concurrently with fail-fast
//!   cancellation.
//! - [`passthrough`] is the echoing catalog used by the binary.

pub mod backend;
pub mod context;
pub mod executor_loop;
pub mod passthrough;
pub mod task_runner;

pub use backend::{BuildFuture, ComponentCatalog};
pub use context::{BuildContext, BuildOutput, StateMutation, StateWrite};
pub use executor_loop::{WaveOutcome, run_wave};
pub use passthrough::PassthroughCatalog;
pub use task_runner::{UnitCompletion, run_unit};
