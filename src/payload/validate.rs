// src/payload/validate.rs

use std::collections::HashSet;

use crate::errors::{FlowdagError, Result};
use crate::payload::model::FlowPayload;

/// Structural checks that must hold before any vertex is created.
///
/// Edge endpoints are not checked here; unresolved endpoints surface as
/// `VertexNotFound` when the graph wires its edges.
pub fn validate_payload(payload: &FlowPayload) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for node in payload.nodes.iter() {
        if node.id.trim().is_empty() {
            return Err(FlowdagError::InvalidPayload(
                "node with an empty id".to_string(),
            ));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(FlowdagError::InvalidPayload(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        if node.data.node_type.trim().is_empty() {
            return Err(FlowdagError::InvalidPayload(format!(
                "node '{}' has an empty type",
                node.id
            )));
        }
    }

    Ok(())
}
