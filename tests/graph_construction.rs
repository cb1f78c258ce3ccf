// tests/graph_construction.rs

mod common;
use crate::common::{FlowBuilder, NodeBuilder, TestResult, chat_chain, init_tracing};

use serde_json::json;

use flowdag::config::EngineConfig;
use flowdag::dag::{Edge, EdgeContract, Graph, ParamValue, Vertex, VertexKind};
use flowdag::errors::FlowdagError;
use flowdag::payload::NodeDescriptor;

fn descriptor(node: NodeBuilder) -> NodeDescriptor {
    serde_json::from_value(node.build()).expect("node descriptor")
}

fn edge(source: &str, target: &str) -> Edge {
    Edge {
        source: source.to_string(),
        target: target.to_string(),
        contract: EdgeContract {
            source_output: None,
            target_input: "input_value".to_string(),
            data_type: None,
        },
    }
}

#[test]
fn chat_chain_has_kinds_roles_and_adjacency() -> TestResult {
    init_tracing();
    let graph = chat_chain().graph();

    assert_eq!(graph.get_vertex("ChatInput-A")?.kind, VertexKind::ChatInput);
    assert_eq!(graph.get_vertex("Prompt-B")?.kind, VertexKind::Prompt);
    assert_eq!(graph.get_vertex("ChatOutput-C")?.kind, VertexKind::ChatOutput);

    assert_eq!(graph.input_vertices(), ["ChatInput-A".to_string()]);
    assert_eq!(graph.output_vertices(), ["ChatOutput-C".to_string()]);
    assert_eq!(
        graph.session_vertices(),
        ["ChatInput-A".to_string(), "ChatOutput-C".to_string()]
    );

    assert_eq!(graph.predecessors("Prompt-B"), ["ChatInput-A".to_string()]);
    assert_eq!(graph.successors("Prompt-B"), ["ChatOutput-C".to_string()]);
    assert_eq!(graph.in_degree("ChatInput-A"), 0);
    assert_eq!(
        graph.all_successors("ChatInput-A").len(),
        2,
        "A reaches B and C"
    );
    assert_eq!(graph.get_vertex("ChatOutput-C")?.display_name, "Final answer");
    Ok(())
}

#[test]
fn edge_to_unknown_vertex_is_rejected() {
    let payload = FlowBuilder::new()
        .vertex("Step-1")
        .edge("Step-1", "Ghost-1")
        .payload();

    match Graph::from_payload(&payload) {
        Err(FlowdagError::VertexNotFound(id)) => assert_eq!(id, "Ghost-1"),
        other => panic!("expected VertexNotFound, got {other:?}"),
    }
}

#[test]
fn cycle_is_rejected_with_its_path() {
    let payload = FlowBuilder::new()
        .vertices(&["Step-1", "Step-2", "Step-3"])
        .edge("Step-1", "Step-2")
        .edge("Step-2", "Step-3")
        .edge("Step-3", "Step-1")
        .payload();

    match Graph::from_payload(&payload) {
        Err(FlowdagError::DagCycle(path)) => {
            for id in ["Step-1", "Step-2", "Step-3"] {
                assert!(path.contains(id), "path {path} should mention {id}");
            }
            assert!(path.contains(" -> "));
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn streaming_vertices_may_not_reach_each_other() {
    let payload = FlowBuilder::new()
        .node(NodeBuilder::from_id("Step-S1").streaming())
        .vertex("Step-Mid")
        .node(NodeBuilder::from_id("Step-S2").streaming())
        .edge("Step-S1", "Step-Mid")
        .edge("Step-Mid", "Step-S2")
        .payload();

    match Graph::from_payload(&payload) {
        Err(FlowdagError::StreamConflict { first, second }) => {
            assert_eq!(first, "Step-S1");
            assert_eq!(second, "Step-S2");
        }
        other => panic!("expected StreamConflict, got {other:?}"),
    }
}

#[test]
fn parallel_streaming_branches_are_fine() -> TestResult {
    let graph = FlowBuilder::new()
        .vertex("Step-Root")
        .node(NodeBuilder::from_id("Step-S1").streaming())
        .node(NodeBuilder::from_id("Step-S2").streaming())
        .edge("Step-Root", "Step-S1")
        .edge("Step-Root", "Step-S2")
        .graph();

    assert!(graph.get_vertex("Step-S1")?.streaming);
    assert!(graph.get_vertex("Step-S2")?.streaming);
    Ok(())
}

#[test]
fn duplicate_edges_collapse() {
    let graph = FlowBuilder::new()
        .vertices(&["Step-1", "Step-2"])
        .edge("Step-1", "Step-2")
        .edge("Step-1", "Step-2")
        .graph();

    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.in_degree("Step-2"), 1);
    assert_eq!(graph.predecessors("Step-2"), ["Step-1".to_string()]);
}

#[test]
fn single_model_is_wired_into_toolkits_without_one() -> TestResult {
    let graph = FlowBuilder::new()
        .node(NodeBuilder::new("OpenAIModel-m", "OpenAIModel").field("model_name", json!("gpt")))
        .node(NodeBuilder::new("JsonToolkit-t", "JsonToolkit"))
        .node(NodeBuilder::new("VectorStoreToolkit-v", "VectorStoreToolkit").field("llm", json!("mine")))
        .graph();

    let toolkit = graph.get_vertex("JsonToolkit-t")?;
    assert_eq!(
        toolkit.params.get("llm"),
        Some(&ParamValue::Component("OpenAIModel-m".to_string()))
    );

    let resolved = graph.resolve_params("JsonToolkit-t")?;
    assert_eq!(resolved["llm"]["vertex_id"], json!("OpenAIModel-m"));
    assert_eq!(resolved["llm"]["params"]["model_name"], json!("gpt"));

    let own = graph.resolve_params("VectorStoreToolkit-v")?;
    assert_eq!(own["llm"], json!("mine"));
    Ok(())
}

#[test]
fn two_models_are_never_injected() -> TestResult {
    let graph = FlowBuilder::new()
        .node(NodeBuilder::new("OpenAIModel-1", "OpenAIModel"))
        .node(NodeBuilder::new("OllamaModel-2", "OllamaModel"))
        .node(NodeBuilder::new("JsonToolkit-t", "JsonToolkit"))
        .graph();

    assert!(!graph.get_vertex("JsonToolkit-t")?.params.contains_key("llm"));
    Ok(())
}

#[test]
fn several_edges_into_one_field_resolve_to_a_list() -> TestResult {
    let graph = FlowBuilder::new()
        .vertices(&["Step-1", "Step-2"])
        .node(NodeBuilder::from_id("Step-Join").list_field("documents"))
        .node(NodeBuilder::from_id("Step-One").list_field("documents"))
        .edge_to("Step-1", "Step-Join", "documents")
        .edge_to("Step-2", "Step-Join", "documents")
        .edge_to("Step-1", "Step-One", "documents")
        .graph();

    // Nothing is built yet, so each reference resolves to null.
    let joined = graph.resolve_params("Step-Join")?;
    assert_eq!(joined["documents"], json!([null, null]));

    let single = graph.resolve_params("Step-One")?;
    assert_eq!(single["documents"], json!([null]), "list fields stay lists");
    Ok(())
}

#[test]
fn kind_overrides_from_config_take_precedence() -> TestResult {
    let mut config = EngineConfig::default();
    config
        .kinds
        .insert("MyLocalModel".to_string(), VertexKind::Model);

    let graph = FlowBuilder::new()
        .node(NodeBuilder::new("MyLocalModel-1", "MyLocalModel"))
        .vertex("Mystery-2")
        .graph_with_config(&config);

    assert_eq!(graph.get_vertex("MyLocalModel-1")?.kind, VertexKind::Model);
    assert_eq!(graph.get_vertex("Mystery-2")?.kind, VertexKind::Generic);
    Ok(())
}

#[test]
fn state_prefixes_select_the_state_kind() -> TestResult {
    let graph = FlowBuilder::new()
        .node(NodeBuilder::from_id("SharedState-1").field("name", json!("topic")))
        .node(NodeBuilder::from_id("Notify-2").field("name", json!("topic")))
        .node(NodeBuilder::from_id("Listen-3").field("name", json!("other")))
        .graph();

    assert_eq!(graph.state_vertices().len(), 3);
    assert_eq!(graph.get_vertex("Listen-3")?.subscription(), Some("other"));
    Ok(())
}

#[test]
fn update_adds_replaces_and_removes_vertices() -> TestResult {
    init_tracing();
    let mut graph = chat_chain().graph();

    let newer = FlowBuilder::new()
        .vertex("ChatInput-A")
        .node(NodeBuilder::from_id("Prompt-B").field("template", json!("Q: {input}")))
        .vertex("Step-New")
        .edge("ChatInput-A", "Prompt-B")
        .edge("Prompt-B", "Step-New")
        .graph();

    graph.update(newer)?;

    assert!(!graph.has_vertex("ChatOutput-C"));
    assert!(graph.has_vertex("Step-New"));
    assert_eq!(graph.successors("Prompt-B"), ["Step-New".to_string()]);
    assert_eq!(
        graph.get_vertex("Prompt-B")?.raw_params.get("template"),
        Some(&ParamValue::Value(json!("Q: {input}")))
    );
    assert_eq!(graph.edges().len(), 2);
    assert_eq!(graph.metadata().updates, 1);
    Ok(())
}

#[test]
fn add_vertex_checks_endpoints_and_cycles_before_mutating() -> TestResult {
    let mut graph = chat_chain().graph();
    let new_vertex = || {
        Vertex::from_descriptor(
            &descriptor(NodeBuilder::from_id("Step-N")),
            VertexKind::Generic,
            None,
        )
    };

    let cyclic = graph.add_vertex(
        new_vertex(),
        vec![edge("ChatOutput-C", "Step-N"), edge("Step-N", "ChatInput-A")],
    );
    assert!(matches!(cyclic, Err(FlowdagError::DagCycle(_))));

    let dangling = graph.add_vertex(new_vertex(), vec![edge("Ghost-1", "Step-N")]);
    assert!(matches!(dangling, Err(FlowdagError::VertexNotFound(id)) if id == "Ghost-1"));
    assert_eq!(graph.vertices().len(), 3, "failed adds leave the graph alone");

    graph.add_vertex(new_vertex(), vec![edge("ChatOutput-C", "Step-N")])?;
    assert_eq!(graph.successors("ChatOutput-C"), ["Step-N".to_string()]);

    let duplicate = graph.add_vertex(new_vertex(), vec![]);
    assert!(matches!(duplicate, Err(FlowdagError::InvalidPayload(_))));
    Ok(())
}

#[test]
fn remove_vertex_drops_its_edges() -> TestResult {
    let mut graph = chat_chain().graph();

    let removed = graph.remove_vertex("Prompt-B")?;
    assert_eq!(removed.id, "Prompt-B");
    assert!(graph.edges().is_empty());
    assert!(graph.predecessors("ChatOutput-C").is_empty());

    assert!(matches!(
        graph.remove_vertex("Prompt-B"),
        Err(FlowdagError::VertexNotFound(_))
    ));
    Ok(())
}

#[test]
fn dot_output_lists_vertices_and_edges() {
    let dot = chat_chain().graph().to_dot();

    assert!(dot.starts_with("digraph"));
    for id in ["ChatInput-A", "Prompt-B", "ChatOutput-C"] {
        assert!(dot.contains(id), "dot output should mention {id}");
    }
    assert!(dot.contains("->"));
    assert!(dot.contains("input_value"));
}

#[test]
fn wrapped_payload_and_metadata() -> TestResult {
    let wrapped = json!({ "name": "demo", "data": chat_chain().to_value() });
    let payload = flowdag::payload::from_value(wrapped)?;
    let mut graph = Graph::from_payload(&payload)?;
    graph.set_flow_id("demo");

    let meta = graph.metadata();
    assert_eq!(meta.flow_id.as_deref(), Some("demo"));
    assert_eq!(meta.vertices, 3);
    assert_eq!(meta.edges, 2);
    assert_eq!(meta.runs, 0);
    Ok(())
}
