// src/engine/run.rs

//! The `run` surface: batches of inputs in, selected vertex results out.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::dag::{Anchor, Graph};
use crate::engine::runtime::Engine;
use crate::errors::{FlowdagError, Result};
use crate::types::InputType;

/// One call to [`Engine::run`].
///
/// `input_selectors[i]` and `types[i]` apply to `inputs[i]`; missing
/// entries mean "no selector" and the configured default input type.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub inputs: Vec<BTreeMap<String, Value>>,
    pub input_selectors: Vec<Vec<String>>,
    pub types: Vec<InputType>,
    /// Vertex ids or display names to report; empty means output vertices.
    pub outputs: Vec<String>,
    pub session_id: Option<String>,
    pub stream: bool,
    /// Overrides the default anchor (the first chat input vertex).
    pub anchor: Option<Anchor>,
}

impl RunRequest {
    pub fn new(inputs: Vec<BTreeMap<String, Value>>) -> Self {
        Self {
            inputs,
            ..Self::default()
        }
    }

    /// A single batch with `value` under `field`.
    pub fn single(field: &str, value: impl Into<Value>) -> Self {
        let mut batch = BTreeMap::new();
        batch.insert(field.to_string(), value.into());
        Self::new(vec![batch])
    }

    pub fn with_selectors(mut self, selectors: Vec<Vec<String>>) -> Self {
        self.input_selectors = selectors;
        self
    }

    pub fn with_types(mut self, types: Vec<InputType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// Result of one vertex, as reported by a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultData {
    pub vertex_id: String,
    pub display_name: String,
    pub result: Value,
    pub artifacts: Map<String, Value>,
}

/// Outcome of one input batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutputs {
    pub inputs: BTreeMap<String, Value>,
    /// One entry per selected vertex, in graph order; `None` when the
    /// vertex did not complete in this run.
    pub outputs: Vec<Option<ResultData>>,
}

impl Engine {
    /// Run `graph` once per input batch, sequentially.
    ///
    /// An empty `inputs` list runs one empty batch. The first failing batch
    /// ends the call with its error.
    pub async fn run(&self, graph: &mut Graph, request: RunRequest) -> Result<Vec<RunOutputs>> {
        let batches = if request.inputs.is_empty() {
            vec![BTreeMap::new()]
        } else {
            request.inputs.clone()
        };

        let mut results = Vec::with_capacity(batches.len());
        for (i, inputs) in batches.into_iter().enumerate() {
            let selectors = request.input_selectors.get(i).cloned().unwrap_or_default();
            let input_type = request
                .types
                .get(i)
                .copied()
                .unwrap_or(graph.config().engine.default_input_type);

            info!(batch = i, input_type = %input_type, "running input batch");
            let outputs = self
                .run_batch(graph, inputs, &selectors, input_type, &request)
                .await?;
            results.push(outputs);
        }
        Ok(results)
    }

    async fn run_batch(
        &self,
        graph: &mut Graph,
        inputs: BTreeMap<String, Value>,
        selectors: &[String],
        input_type: InputType,
        request: &RunRequest,
    ) -> Result<RunOutputs> {
        let field = graph.config().engine.input_field.clone();
        if let Some(value) = inputs.get(&field).filter(|v| !v.is_string()) {
            return Err(FlowdagError::InvalidInput(format!(
                "invalid value {value} for '{field}': expected a string"
            )));
        }

        for id in graph.input_vertices().to_vec() {
            let vertex = graph.get_vertex(&id)?;
            let selected = selectors.is_empty()
                || selectors
                    .iter()
                    .any(|s| *s == vertex.id || *s == vertex.display_name);
            if !selected || !input_type.accepts(&id) {
                debug!(vertex = %id, "input vertex not targeted by this batch");
                continue;
            }
            graph.get_vertex_mut(&id)?.update_raw_params(&inputs, true);
        }

        if let Some(session_id) = &request.session_id {
            let mut values = BTreeMap::new();
            values.insert("session_id".to_string(), Value::String(session_id.clone()));
            for id in graph.session_vertices().to_vec() {
                graph.get_vertex_mut(&id)?.update_raw_params(&values, true);
            }
        }

        let anchor = match &request.anchor {
            Some(anchor) => anchor.clone(),
            None => graph
                .input_vertices()
                .iter()
                .find(|id| id.to_lowercase().contains("chat"))
                .map(|id| Anchor::Start(id.clone()))
                .unwrap_or_default(),
        };

        self.process_with(graph, &anchor, request.stream).await?;

        let outputs = graph
            .vertices()
            .iter()
            .filter(|v| {
                if request.outputs.is_empty() {
                    v.is_output()
                } else {
                    request
                        .outputs
                        .iter()
                        .any(|o| *o == v.id || *o == v.display_name)
                }
            })
            .map(|v| {
                let result = v.result.clone().filter(|_| v.is_built())?;
                Some(ResultData {
                    vertex_id: v.id.clone(),
                    display_name: v.display_name.clone(),
                    result,
                    artifacts: v.artifacts.clone(),
                })
            })
            .collect();

        Ok(RunOutputs { inputs, outputs })
    }
}
