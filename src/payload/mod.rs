// src/payload/mod.rs

//! Editor payload: the declarative node/edge description of a flow.
//!
//! - [`model`] is the serde model.
//! - [`loader`] parses JSON (bare or wrapped under `data`).
//! - [`flatten`] ungroups group nodes before graph construction.
//! - [`validate`] holds structural checks on node descriptors.

pub mod flatten;
pub mod loader;
pub mod model;
pub mod validate;

pub use flatten::flatten_groups;
pub use loader::{from_str, from_value, load_from_path};
pub use model::{
    EdgeData, EdgeDescriptor, FlowPayload, NodeBody, NodeData, NodeDescriptor, NodeTemplate,
    SourceHandle, TargetHandle,
};
pub use validate::validate_payload;
