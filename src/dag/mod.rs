// src/dag/mod.rs

//! Graph representation and scheduling.
//!
//! - [`vertex`] holds component instances and the kind dispatch rule.
//! - [`edge`] holds data dependencies between vertices.
//! - [`graph`] builds and owns both, with derived adjacency maps.
//! - [`layering`] assigns vertices to waves for a run.
//! - [`ledger`] tracks outstanding dependencies while a run progresses.
//! - [`state_store`] is the run-scoped blackboard behind state vertices.

pub mod edge;
pub mod graph;
pub mod layering;
pub mod ledger;
pub mod state_store;
pub mod vertex;

pub use edge::{Edge, EdgeContract};
pub use graph::{Graph, GraphMetadata};
pub use layering::Anchor;
pub use ledger::DependencyLedger;
pub use state_store::StateStore;
pub use vertex::{ParamValue, Vertex, VertexKind, VertexRef, resolve_kind};
