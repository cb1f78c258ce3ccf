#![allow(dead_code)]

use flowdag::config::EngineConfig;
use flowdag::dag::Graph;
use flowdag::dag::vertex::id_prefix;
use flowdag::payload::{FlowPayload, from_value};
use serde_json::{Map, Value, json};

/// Builder for one node descriptor of a flow payload.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    id: String,
    node_type: String,
    base_type: String,
    display_name: Option<String>,
    fields: Map<String, Value>,
    frozen: bool,
}

impl NodeBuilder {
    /// Node of type `node_type`; the base type defaults to the same name.
    pub fn new(id: &str, node_type: &str) -> Self {
        Self {
            id: id.to_string(),
            node_type: node_type.to_string(),
            base_type: node_type.to_string(),
            display_name: None,
            fields: Map::new(),
            frozen: false,
        }
    }

    /// Node whose type is the component name encoded in its id
    /// (`Prompt-1` -> `Prompt`).
    pub fn from_id(id: &str) -> Self {
        Self::new(id, id_prefix(id))
    }

    pub fn base_type(mut self, base_type: &str) -> Self {
        self.base_type = base_type.to_string();
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Template field with a literal value.
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), json!({ "value": value }));
        self
    }

    /// Template field declared as a list.
    pub fn list_field(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), json!({ "value": [], "list": true }));
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn streaming(self) -> Self {
        self.field("streaming", json!(true))
    }

    pub fn build(self) -> Value {
        let mut template = self.fields;
        template.insert("_type".to_string(), json!(self.base_type));

        let mut node = Map::new();
        node.insert("template".to_string(), Value::Object(template));
        node.insert("frozen".to_string(), json!(self.frozen));
        if let Some(name) = self.display_name {
            node.insert("display_name".to_string(), json!(name));
        }

        json!({
            "id": self.id,
            "data": { "type": self.node_type, "node": node }
        })
    }
}

/// Builder for a whole flow payload.
#[derive(Debug, Clone, Default)]
pub struct FlowBuilder {
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.nodes.push(node.build());
        self
    }

    /// Shorthand for a node typed after its id prefix.
    pub fn vertex(self, id: &str) -> Self {
        self.node(NodeBuilder::from_id(id))
    }

    pub fn vertices(self, ids: &[&str]) -> Self {
        ids.iter().fold(self, |b, id| b.vertex(id))
    }

    /// Edge feeding `target`'s `input_value`.
    pub fn edge(self, source: &str, target: &str) -> Self {
        self.edge_to(source, target, "input_value")
    }

    /// Edge feeding a named field of `target`.
    pub fn edge_to(mut self, source: &str, target: &str, field: &str) -> Self {
        self.edges.push(json!({
            "source": source,
            "target": target,
            "data": {
                "sourceHandle": { "id": source },
                "targetHandle": { "fieldName": field, "id": target, "type": "str" }
            }
        }));
        self
    }

    /// Edge from a named output of `source` into a field of `target`.
    pub fn edge_from_output(mut self, source: &str, output: &str, target: &str, field: &str) -> Self {
        self.edges.push(json!({
            "source": source,
            "target": target,
            "data": {
                "sourceHandle": { "id": source, "name": output },
                "targetHandle": { "fieldName": field, "id": target, "type": "str" }
            }
        }));
        self
    }

    pub fn to_value(&self) -> Value {
        json!({ "nodes": self.nodes, "edges": self.edges })
    }

    pub fn payload(&self) -> FlowPayload {
        from_value(self.to_value()).expect("builder produced an invalid payload")
    }

    pub fn graph(&self) -> Graph {
        Graph::from_payload(&self.payload()).expect("builder produced an invalid graph")
    }

    pub fn graph_with_config(&self, config: &EngineConfig) -> Graph {
        Graph::from_payload_with_config(&self.payload(), config)
            .expect("builder produced an invalid graph")
    }
}
