// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use flowdag::engine::Engine;

pub use flowdag_test_utils::{
    Behaviour, FlowBuilder, NodeBuilder, ScriptedCatalog, init_tracing, with_timeout,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `ChatInput-A -> Prompt-B -> ChatOutput-C`.
pub fn chat_chain() -> FlowBuilder {
    FlowBuilder::new()
        .vertex("ChatInput-A")
        .vertex("Prompt-B")
        .node(NodeBuilder::from_id("ChatOutput-C").display_name("Final answer"))
        .edge("ChatInput-A", "Prompt-B")
        .edge("Prompt-B", "ChatOutput-C")
}

/// Catalog for [`chat_chain`]: the prompt tags its input with `B`.
pub fn chat_chain_catalog() -> ScriptedCatalog {
    ScriptedCatalog::new().with("Prompt-B", Behaviour::Tag("B".to_string()))
}

pub fn engine_with(catalog: &ScriptedCatalog) -> Engine {
    Engine::new(Arc::new(catalog.clone()))
}
