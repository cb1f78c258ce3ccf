// src/payload/model.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node/edge payload produced by the visual editor.
///
/// ```json
/// {
///   "nodes": [{"id": "ChatInput-1", "data": {"type": "ChatInput",
///              "node": {"template": {"_type": "CustomComponent"}}}}],
///   "edges": [{"source": "ChatInput-1", "target": "ChatOutput-2",
///              "data": {"sourceHandle": {...}, "targetHandle": {...}}}]
/// }
/// ```
///
/// Only the fields the engine consumes are modelled; everything else is
/// carried along in the `extra` maps so a payload survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPayload {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub data: NodeData,
    /// Set when the node was spliced in from a group node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Declared type name, e.g. `ChatInput` or `OpenAIModel`.
    #[serde(rename = "type")]
    pub node_type: String,
    pub node: NodeBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBody {
    pub template: NodeTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub base_classes: Vec<String>,
    /// Nested flow of a group node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<Box<GroupFlow>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Component template: `_type` plus one entry per field.
///
/// Field entries are usually objects like `{"value": ..., "list": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    #[serde(rename = "_type")]
    pub base_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NodeTemplate {
    /// The `value` of a template field, if the field is present.
    pub fn field_value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).and_then(|f| f.get("value"))
    }

    /// Whether a template field declares `"list": true`.
    pub fn field_is_list(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .and_then(|f| f.get("list"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFlow {
    pub data: FlowPayload,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescriptor {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub data: EdgeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EdgeData {
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: SourceHandle,
    #[serde(rename = "targetHandle", default)]
    pub target_handle: TargetHandle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SourceHandle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Named output of the source component; `None` means its main result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "baseClasses", default)]
    pub base_classes: Vec<String>,
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TargetHandle {
    #[serde(rename = "fieldName", default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "inputTypes", default, skip_serializing_if = "Option::is_none")]
    pub input_types: Option<Vec<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub handle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyRef>,
}

/// Pointer from a group node's field to the inner node that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRef {
    pub field: String,
    pub id: String,
}
