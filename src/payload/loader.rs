// src/payload/loader.rs

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::errors::{FlowdagError, Result};
use crate::payload::model::FlowPayload;

/// Parse a payload from a JSON value.
///
/// Accepts either the bare `{nodes, edges}` object or the stored-flow form
/// that wraps it under `data`.
pub fn from_value(value: Value) -> Result<FlowPayload> {
    let value = match value {
        Value::Object(mut map) if !map.contains_key("nodes") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    let Value::Object(ref map) = value else {
        return Err(FlowdagError::InvalidPayload(
            "expected a JSON object with keys 'nodes' and 'edges'".to_string(),
        ));
    };

    if !map.contains_key("nodes") || !map.contains_key("edges") {
        let found: Vec<&String> = map.keys().collect();
        return Err(FlowdagError::InvalidPayload(format!(
            "Expected keys 'nodes' and 'edges'. Found {found:?}"
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| FlowdagError::InvalidPayload(format!("error while reading payload: {e}")))
}

/// Parse a payload from a JSON string.
pub fn from_str(json: &str) -> Result<FlowPayload> {
    let value: Value = serde_json::from_str(json)?;
    from_value(value)
}

/// Read and parse a payload file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<FlowPayload> {
    let contents = fs::read_to_string(path.as_ref())?;
    from_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "nodes": [{"id": "ChatInput-1", "data": {"type": "ChatInput",
                   "node": {"template": {"_type": "CustomComponent"}}}}],
        "edges": []
    }"#;

    #[test]
    fn accepts_bare_payload() {
        let payload = from_str(MINIMAL).unwrap();
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.nodes[0].data.node.template.base_type, "CustomComponent");
    }

    #[test]
    fn accepts_wrapped_payload() {
        let wrapped = format!(r#"{{"name": "flow", "data": {MINIMAL}}}"#);
        let payload = from_str(&wrapped).unwrap();
        assert_eq!(payload.nodes[0].id, "ChatInput-1");
    }

    #[test]
    fn missing_keys_is_invalid_payload() {
        match from_str(r#"{"vertices": []}"#) {
            Err(FlowdagError::InvalidPayload(msg)) => assert!(msg.contains("vertices")),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn node_without_base_type_is_invalid_payload() {
        let json = r#"{"nodes": [{"id": "A", "data": {"type": "X", "node": {"template": {}}}}],
                       "edges": []}"#;
        assert!(matches!(from_str(json), Err(FlowdagError::InvalidPayload(_))));
    }
}
