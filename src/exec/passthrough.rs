// src/exec/passthrough.rs

use serde_json::{Map, Value, json};

use crate::exec::backend::{BuildFuture, ComponentCatalog};
use crate::exec::context::BuildContext;

/// Catalog used by the binary: every component echoes what it was given.
///
/// Input and output vertices forward their `input_value`; every other
/// vertex returns its resolved parameters as an object. Lets a flow be
/// scheduled and traced end to end without real components.
#[derive(Debug, Clone, Default)]
pub struct PassthroughCatalog;

impl ComponentCatalog for PassthroughCatalog {
    fn build(&self, ctx: BuildContext) -> BuildFuture {
        Box::pin(async move {
            let result = if ctx.kind.is_input() || ctx.kind.is_output() {
                ctx.param("input_value").cloned().unwrap_or(Value::Null)
            } else {
                Value::Object(ctx.params.clone().into_iter().collect::<Map<String, Value>>())
            };
            let mut artifacts = Map::new();
            artifacts.insert("kind".to_string(), json!(ctx.kind.as_str()));
            artifacts.insert("type".to_string(), json!(ctx.node_type));
            Ok(ctx.finish_with_artifacts(result, artifacts))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::dag::VertexKind;

    #[tokio::test]
    async fn inputs_forward_their_value() {
        let mut params = BTreeMap::new();
        params.insert("input_value".to_string(), json!("hi"));
        let ctx = BuildContext::new(
            "r",
            "ChatInput-1",
            "Chat Input",
            VertexKind::ChatInput,
            "ChatInput",
            params,
            BTreeMap::new(),
            false,
        );

        let out = PassthroughCatalog.build(ctx).await.unwrap();
        assert_eq!(out.result, json!("hi"));
        assert_eq!(out.artifacts["kind"], json!("chat_input"));
    }

    #[tokio::test]
    async fn other_vertices_echo_params() {
        let mut params = BTreeMap::new();
        params.insert("template".to_string(), json!("{q}"));
        let ctx = BuildContext::new(
            "r",
            "Prompt-1",
            "Prompt",
            VertexKind::Prompt,
            "Prompt",
            params,
            BTreeMap::new(),
            false,
        );

        let out = PassthroughCatalog.build(ctx).await.unwrap();
        assert_eq!(out.result, json!({"template": "{q}"}));
    }
}
