// src/dag/edge.rs

use crate::errors::{FlowdagError, Result};
use crate::payload::EdgeDescriptor;
use crate::types::VertexId;

/// Field an edge feeds when its target handle names none.
pub const DEFAULT_TARGET_INPUT: &str = "input_value";

/// What an edge carries: which output of the source feeds which input of
/// the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeContract {
    /// Named output of the source; `None` means the whole result.
    pub source_output: Option<String>,
    pub target_input: String,
    pub data_type: Option<String>,
}

/// Directed data dependency between two vertices.
///
/// Two edges with the same endpoints and contract are the same edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub contract: EdgeContract,
}

impl Edge {
    /// Build an edge from its descriptor, checking that both endpoints exist.
    pub fn from_descriptor(
        descriptor: &EdgeDescriptor,
        has_vertex: impl Fn(&str) -> bool,
    ) -> Result<Self> {
        for endpoint in [&descriptor.source, &descriptor.target] {
            if !has_vertex(endpoint) {
                return Err(FlowdagError::VertexNotFound(endpoint.clone()));
            }
        }

        let source_handle = &descriptor.data.source_handle;
        let target_handle = &descriptor.data.target_handle;

        Ok(Self {
            source: descriptor.source.clone(),
            target: descriptor.target.clone(),
            contract: EdgeContract {
                source_output: source_handle.name.clone(),
                target_input: target_handle
                    .field_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TARGET_INPUT.to_string()),
                data_type: source_handle.data_type.clone(),
            },
        })
    }

    pub fn touches(&self, vertex_id: &str) -> bool {
        self.source == vertex_id || self.target == vertex_id
    }
}
