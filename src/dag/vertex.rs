// src/dag/vertex.rs

//! Vertices: one per component instance in the flow.
//!
//! The behaviour variant of a vertex is a closed [`VertexKind`] chosen by
//! [`resolve_kind`] from the declared type, the declared base type and the
//! naming convention of the id (`<Component>-<suffix>`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::dag::edge::Edge;
use crate::payload::{NodeData, NodeDescriptor};
use crate::types::{BuildState, VertexId};

/// Behaviour variant of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    ChatInput,
    ChatOutput,
    TextInput,
    TextOutput,
    SessionId,
    /// Subscribes to a named entry of the run's state store.
    State,
    Model,
    Toolkit,
    Tool,
    FileTool,
    Prompt,
    Agent,
    Memory,
    Embedding,
    DocumentLoader,
    TextSplitter,
    Retriever,
    Wrapper,
    CustomComponent,
    /// Anything unmapped. Still scheduled; behaviour comes from the catalog.
    Generic,
}

impl VertexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexKind::ChatInput => "chat_input",
            VertexKind::ChatOutput => "chat_output",
            VertexKind::TextInput => "text_input",
            VertexKind::TextOutput => "text_output",
            VertexKind::SessionId => "session_id",
            VertexKind::State => "state",
            VertexKind::Model => "model",
            VertexKind::Toolkit => "toolkit",
            VertexKind::Tool => "tool",
            VertexKind::FileTool => "file_tool",
            VertexKind::Prompt => "prompt",
            VertexKind::Agent => "agent",
            VertexKind::Memory => "memory",
            VertexKind::Embedding => "embedding",
            VertexKind::DocumentLoader => "document_loader",
            VertexKind::TextSplitter => "text_splitter",
            VertexKind::Retriever => "retriever",
            VertexKind::Wrapper => "wrapper",
            VertexKind::CustomComponent => "custom_component",
            VertexKind::Generic => "generic",
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, VertexKind::ChatInput | VertexKind::TextInput)
    }

    pub fn is_output(&self) -> bool {
        matches!(self, VertexKind::ChatOutput | VertexKind::TextOutput)
    }

    pub fn is_state(&self) -> bool {
        matches!(self, VertexKind::State)
    }

    /// Chat components always take part in a session.
    pub fn is_chat(&self) -> bool {
        matches!(
            self,
            VertexKind::ChatInput
                | VertexKind::ChatOutput
                | VertexKind::TextInput
                | VertexKind::TextOutput
                | VertexKind::SessionId
        )
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VertexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().replace('-', "_").as_str() {
            "chat_input" => VertexKind::ChatInput,
            "chat_output" => VertexKind::ChatOutput,
            "text_input" => VertexKind::TextInput,
            "text_output" => VertexKind::TextOutput,
            "session_id" => VertexKind::SessionId,
            "state" => VertexKind::State,
            "model" | "llm" => VertexKind::Model,
            "toolkit" => VertexKind::Toolkit,
            "tool" => VertexKind::Tool,
            "file_tool" => VertexKind::FileTool,
            "prompt" => VertexKind::Prompt,
            "agent" => VertexKind::Agent,
            "memory" => VertexKind::Memory,
            "embedding" => VertexKind::Embedding,
            "document_loader" => VertexKind::DocumentLoader,
            "text_splitter" => VertexKind::TextSplitter,
            "retriever" => VertexKind::Retriever,
            "wrapper" => VertexKind::Wrapper,
            "custom_component" => VertexKind::CustomComponent,
            "generic" => VertexKind::Generic,
            other => return Err(format!("unknown vertex kind: {other}")),
        };
        Ok(kind)
    }
}

/// Type names whose vertices are file-backed tools.
const FILE_TOOLS: &[&str] = &["JsonSpec"];

static ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^-]+)-").expect("static regex is valid"));

/// Component name encoded in a vertex id (`ChatInput-x1` -> `ChatInput`).
pub fn id_prefix(id: &str) -> &str {
    ID_PREFIX
        .captures(id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(id)
}

fn builtin_kind(type_name: &str) -> Option<VertexKind> {
    let kind = match type_name {
        "ChatInput" => VertexKind::ChatInput,
        "ChatOutput" => VertexKind::ChatOutput,
        "TextInput" => VertexKind::TextInput,
        "TextOutput" => VertexKind::TextOutput,
        "SessionID" => VertexKind::SessionId,
        "OpenAI" | "ChatOpenAI" | "AzureChatOpenAI" | "OpenAIModel" | "Anthropic"
        | "ChatAnthropic" | "AnthropicModel" | "Ollama" | "ChatOllama" | "OllamaModel"
        | "ChatVertexAI" | "ChatLiteLLM" | "HuggingFaceHub" | "LlamaCpp" | "CTransformers" => {
            VertexKind::Model
        }
        "JsonToolkit" | "OpenAPIToolkit" | "VectorStoreInfo" | "VectorStoreToolkit"
        | "VectorStoreRouterToolkit" => VertexKind::Toolkit,
        "Tool" | "PythonFunctionTool" | "SearchApi" | "Calculator" | "RunFlow" => VertexKind::Tool,
        "Prompt" | "PromptTemplate" | "ChatPromptTemplate" => VertexKind::Prompt,
        "ZeroShotAgent" | "JsonAgent" | "CSVAgent" | "AgentInitializer" | "VectorStoreAgent"
        | "VectorStoreRouterAgent" | "SQLAgent" => VertexKind::Agent,
        "ConversationBufferMemory" | "ConversationBufferWindowMemory"
        | "ConversationSummaryMemory" | "ConversationKGMemory" | "ConversationEntityMemory" => {
            VertexKind::Memory
        }
        "OpenAIEmbeddings" | "HuggingFaceEmbeddings" | "CohereEmbeddings" => VertexKind::Embedding,
        "TextLoader" | "PyPDFLoader" | "CSVLoader" | "WebBaseLoader" | "DirectoryLoader" => {
            VertexKind::DocumentLoader
        }
        "CharacterTextSplitter" | "RecursiveCharacterTextSplitter"
        | "LanguageRecursiveTextSplitter" => VertexKind::TextSplitter,
        "MultiQueryRetriever" | "SelfQueryRetriever" | "VectorStoreRetriever" => {
            VertexKind::Retriever
        }
        "TextRequestsWrapper" | "SQLDatabase" => VertexKind::Wrapper,
        "CustomComponent" => VertexKind::CustomComponent,
        _ => return None,
    };
    Some(kind)
}

/// Select the vertex kind for a node.
///
/// Order of precedence:
/// 1. id prefix `ChatInput` / `ChatOutput`;
/// 2. id prefix `SharedState` / `Notify` / `Listen` (state vertices);
/// 3. the base type (`_type`) in the type table;
/// 4. the id prefix in the type table;
/// 5. file tools by declared type;
/// 6. the declared type in the type table;
/// 7. [`VertexKind::Generic`].
///
/// `overrides` are consulted before the built-in table at every lookup.
pub fn resolve_kind(
    node_type: &str,
    base_type: &str,
    id: &str,
    overrides: &BTreeMap<String, VertexKind>,
) -> VertexKind {
    let lookup = |name: &str| overrides.get(name).copied().or_else(|| builtin_kind(name));
    let prefix = id_prefix(id);

    match prefix {
        "ChatInput" => return VertexKind::ChatInput,
        "ChatOutput" => return VertexKind::ChatOutput,
        "SharedState" | "Notify" | "Listen" => return VertexKind::State,
        _ => {}
    }

    if let Some(kind) = lookup(base_type) {
        return kind;
    }
    if let Some(kind) = lookup(prefix) {
        return kind;
    }
    if FILE_TOOLS.contains(&node_type) {
        return VertexKind::FileTool;
    }
    lookup(node_type).unwrap_or(VertexKind::Generic)
}

/// Reference from a parameter to another vertex's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRef {
    pub vertex: VertexId,
    /// Named output; `None` selects the whole result.
    pub output: Option<String>,
}

/// A parameter before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Value(Value),
    Ref(VertexRef),
    RefList(Vec<VertexRef>),
    /// Auto-wired component (the shared model of toolkits). Resolves to the
    /// component's result when built, else to a description of it.
    Component(VertexId),
}

/// One component instance in the graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub display_name: String,
    pub kind: VertexKind,
    /// Raw node data from the payload.
    pub data: NodeData,
    pub parent_node_id: Option<String>,
    /// Literal template values, before any edge is wired in.
    pub raw_params: BTreeMap<String, ParamValue>,
    /// Raw values plus edge references; rebuilt whenever edges change.
    pub params: BTreeMap<String, ParamValue>,
    pub state: BuildState,
    pub frozen: bool,
    pub result: Option<Value>,
    pub artifacts: Map<String, Value>,
    /// Reachability marker; inactive vertices are never dispatched.
    pub active: bool,
    pub streaming: bool,
    build_times: Vec<Duration>,
    build_time_hint: Option<Duration>,
}

impl Vertex {
    pub fn from_descriptor(
        node: &NodeDescriptor,
        kind: VertexKind,
        build_time_hint: Option<Duration>,
    ) -> Self {
        let data = node.data.clone();
        let display_name = data
            .node
            .display_name
            .clone()
            .or_else(|| data.display_name.clone())
            .unwrap_or_else(|| node.id.clone());

        let raw_params = raw_params_from_template(&data);
        let streaming = ["stream", "streaming"].iter().any(|f| {
            data.node
                .template
                .field_value(f)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        });

        Self {
            id: node.id.clone(),
            display_name,
            kind,
            frozen: data.node.frozen,
            parent_node_id: node.parent_node_id.clone(),
            params: raw_params.clone(),
            raw_params,
            data,
            state: BuildState::Unbuilt,
            result: None,
            artifacts: Map::new(),
            active: true,
            streaming,
            build_times: Vec::new(),
            build_time_hint,
        }
    }

    pub fn node_type(&self) -> &str {
        &self.data.node_type
    }

    pub fn base_type(&self) -> &str {
        &self.data.node.template.base_type
    }

    pub fn is_input(&self) -> bool {
        self.kind.is_input()
    }

    pub fn is_output(&self) -> bool {
        self.kind.is_output()
    }

    pub fn is_state(&self) -> bool {
        self.kind.is_state()
    }

    pub fn has_session_id(&self) -> bool {
        self.kind.is_chat() || self.data.node.template.fields.contains_key("session_id")
    }

    pub fn is_built(&self) -> bool {
        self.state == BuildState::Built
    }

    /// State-store entry a state vertex subscribes to (its `name` field).
    pub fn subscription(&self) -> Option<&str> {
        if !self.is_state() {
            return None;
        }
        match self.raw_params.get("name") {
            Some(ParamValue::Value(Value::String(name))) if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    /// Rebuild `params` from the raw values and the edges into this vertex.
    ///
    /// Several edges into one field, or an edge into a field declared as a
    /// list, produce a [`ParamValue::RefList`].
    pub fn build_params<'a>(&mut self, incoming: impl IntoIterator<Item = &'a Edge>) {
        let mut params = self.raw_params.clone();
        let mut refs: BTreeMap<String, Vec<VertexRef>> = BTreeMap::new();

        for edge in incoming {
            if edge.target != self.id {
                continue;
            }
            refs.entry(edge.contract.target_input.clone())
                .or_default()
                .push(VertexRef {
                    vertex: edge.source.clone(),
                    output: edge.contract.source_output.clone(),
                });
        }

        for (field, mut list) in refs {
            let value = if list.len() == 1 && !self.data.node.template.field_is_list(&field) {
                ParamValue::Ref(list.remove(0))
            } else {
                ParamValue::RefList(list)
            };
            params.insert(field, value);
        }

        self.params = params;
    }

    /// Merge new literal values into the raw parameters.
    ///
    /// With `overwrite == false` only keys that already exist are updated.
    pub fn update_raw_params(&mut self, values: &BTreeMap<String, Value>, overwrite: bool) {
        for (key, value) in values {
            if !overwrite && !self.raw_params.contains_key(key) {
                continue;
            }
            self.raw_params
                .insert(key.clone(), ParamValue::Value(value.clone()));
            self.params
                .insert(key.clone(), ParamValue::Value(value.clone()));
        }
    }

    /// Record a successful build.
    pub fn set_result(&mut self, result: Value, artifacts: Map<String, Value>, elapsed: Duration) {
        self.result = Some(result);
        self.artifacts = artifacts;
        self.state = BuildState::Built;
        self.build_times.push(elapsed);
    }

    /// Forget the last result, unless the vertex is frozen and built.
    pub fn reset(&mut self) {
        if self.frozen && self.is_built() {
            return;
        }
        self.state = BuildState::Unbuilt;
        self.result = None;
        self.artifacts = Map::new();
    }

    /// Mean of the recorded build durations, else the configured hint, else zero.
    pub fn avg_build_time(&self) -> Duration {
        if self.build_times.is_empty() {
            return self.build_time_hint.unwrap_or(Duration::ZERO);
        }
        let total: Duration = self.build_times.iter().sum();
        total / self.build_times.len() as u32
    }

    /// Keep build history and (for frozen vertices) results across a
    /// replacement of this vertex's definition.
    pub(crate) fn carry_over_from(&mut self, previous: &Vertex) {
        self.build_times = previous.build_times.clone();
        if self.frozen && previous.is_built() {
            self.state = previous.state;
            self.result = previous.result.clone();
            self.artifacts = previous.artifacts.clone();
        }
    }

    /// Short description handed to consumers of an auto-wired component.
    pub(crate) fn describe(&self) -> Value {
        let params: Map<String, Value> = self
            .raw_params
            .iter()
            .filter_map(|(k, v)| match v {
                ParamValue::Value(value) => Some((k.clone(), value.clone())),
                _ => None,
            })
            .collect();
        json!({
            "vertex_id": self.id,
            "type": self.node_type(),
            "params": params,
        })
    }
}

fn raw_params_from_template(data: &NodeData) -> BTreeMap<String, ParamValue> {
    data.node
        .template
        .fields
        .iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .filter_map(|(name, field)| {
            let value = match field {
                Value::Object(map) => map.get("value").cloned()?,
                other => other.clone(),
            };
            Some((name.clone(), ParamValue::Value(value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::edge::EdgeContract;
    use crate::payload::loader::from_value;

    fn no_overrides() -> BTreeMap<String, VertexKind> {
        BTreeMap::new()
    }

    #[test]
    fn kind_dispatch_follows_precedence() {
        let o = no_overrides();
        assert_eq!(resolve_kind("Anything", "CustomComponent", "ChatInput-1", &o), VertexKind::ChatInput);
        assert_eq!(resolve_kind("Notify", "CustomComponent", "Notify-7", &o), VertexKind::State);
        assert_eq!(resolve_kind("X", "ChatOpenAI", "Model-1", &o), VertexKind::Model);
        assert_eq!(resolve_kind("X", "Unknown", "Prompt-1", &o), VertexKind::Prompt);
        assert_eq!(resolve_kind("JsonSpec", "Unknown", "Spec-1", &o), VertexKind::FileTool);
        assert_eq!(resolve_kind("JsonToolkit", "Unknown", "Kit-1", &o), VertexKind::Toolkit);
        assert_eq!(resolve_kind("Mystery", "Mystery", "Mystery-1", &o), VertexKind::Generic);
    }

    #[test]
    fn overrides_extend_the_type_table() {
        let mut o = no_overrides();
        o.insert("MyLocalModel".to_string(), VertexKind::Model);
        assert_eq!(resolve_kind("X", "MyLocalModel", "Local-1", &o), VertexKind::Model);
    }

    #[test]
    fn id_prefix_uses_first_dash() {
        assert_eq!(id_prefix("ChatInput-abc-def"), "ChatInput");
        assert_eq!(id_prefix("nodash"), "nodash");
    }

    fn vertex(json: Value) -> Vertex {
        let payload = from_value(serde_json::json!({"nodes": [json], "edges": []})).unwrap();
        let node = &payload.nodes[0];
        let kind = resolve_kind(
            &node.data.node_type,
            &node.data.node.template.base_type,
            &node.id,
            &no_overrides(),
        );
        Vertex::from_descriptor(node, kind, None)
    }

    #[test]
    fn template_values_become_raw_params() {
        let v = vertex(serde_json::json!({"id": "SharedState-1", "data": {"type": "SharedState",
            "node": {"display_name": "Topic", "template": {"_type": "CustomComponent",
                "name": {"value": "topic"}, "streaming": {"value": true}}}}}));

        assert_eq!(v.display_name, "Topic");
        assert!(v.is_state());
        assert!(v.streaming);
        assert_eq!(v.subscription(), Some("topic"));
    }

    #[test]
    fn multiple_edges_into_one_field_become_a_list() {
        let mut v = vertex(serde_json::json!({"id": "Prompt-1", "data": {"type": "Prompt",
            "node": {"template": {"_type": "Prompt"}}}}));
        let edge = |source: &str| Edge {
            source: source.to_string(),
            target: "Prompt-1".to_string(),
            contract: EdgeContract {
                source_output: None,
                target_input: "context".to_string(),
                data_type: None,
            },
        };
        let edges = [edge("A-1"), edge("B-1")];
        v.build_params(edges.iter());

        match v.params.get("context") {
            Some(ParamValue::RefList(list)) => assert_eq!(list.len(), 2),
            other => panic!("expected RefList, got {other:?}"),
        }
    }

    #[test]
    fn update_without_overwrite_only_touches_known_keys() {
        let mut v = vertex(serde_json::json!({"id": "ChatInput-1", "data": {"type": "ChatInput",
            "node": {"template": {"_type": "CustomComponent", "session_id": {"value": ""}}}}}));
        let mut values = BTreeMap::new();
        values.insert("session_id".to_string(), Value::from("s-1"));
        values.insert("unknown".to_string(), Value::from("x"));
        v.update_raw_params(&values, false);

        assert_eq!(v.raw_params.get("session_id"), Some(&ParamValue::Value(Value::from("s-1"))));
        assert!(!v.raw_params.contains_key("unknown"));
    }

    #[test]
    fn average_build_time_falls_back_to_hint() {
        let node = serde_json::json!({"id": "Prompt-1", "data": {"type": "Prompt",
            "node": {"template": {"_type": "Prompt"}}}});
        let payload = from_value(serde_json::json!({"nodes": [node], "edges": []})).unwrap();
        let mut v = Vertex::from_descriptor(
            &payload.nodes[0],
            VertexKind::Prompt,
            Some(Duration::from_millis(40)),
        );
        assert_eq!(v.avg_build_time(), Duration::from_millis(40));

        v.set_result(Value::Null, Map::new(), Duration::from_millis(10));
        v.set_result(Value::Null, Map::new(), Duration::from_millis(30));
        assert_eq!(v.avg_build_time(), Duration::from_millis(20));
    }

    #[test]
    fn reset_keeps_frozen_results() {
        let node = serde_json::json!({"id": "Prompt-1", "data": {"type": "Prompt",
            "node": {"frozen": true, "template": {"_type": "Prompt"}}}});
        let payload = from_value(serde_json::json!({"nodes": [node], "edges": []})).unwrap();
        let mut v = Vertex::from_descriptor(&payload.nodes[0], VertexKind::Prompt, None);
        v.set_result(Value::from("pinned"), Map::new(), Duration::ZERO);
        v.reset();

        assert!(v.is_built());
        assert_eq!(v.result, Some(Value::from("pinned")));
    }
}
