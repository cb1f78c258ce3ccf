// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod payload;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::dag::{Anchor, Graph};
use crate::engine::{Engine, RunRequest};
use crate::exec::PassthroughCatalog;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and payload loading
/// - graph construction and validation
/// - dry-run / DOT output
/// - the engine, running the flow through [`PassthroughCatalog`]
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config '{}'", args.config))?;
    let payload = payload::load_from_path(&args.flow)
        .with_context(|| format!("loading flow '{}'", args.flow))?;

    let mut graph = Graph::from_payload_with_config(&payload, &cfg)?;
    graph.set_flow_id(args.flow.clone());

    let anchor = anchor_from_args(&args);

    if args.dot {
        print!("{}", graph.to_dot());
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&mut graph, anchor.as_ref().unwrap_or(&Anchor::Whole))?;
        return Ok(());
    }

    let field = cfg.engine.input_field.clone();
    let inputs: Vec<BTreeMap<String, Value>> = args
        .inputs
        .iter()
        .map(|text| BTreeMap::from([(field.clone(), Value::String(text.clone()))]))
        .collect();

    let mut request = RunRequest::new(inputs).with_outputs(args.outputs.clone());
    if let Some(session_id) = &args.session_id {
        request = request.with_session_id(session_id.clone());
    }
    if let Some(anchor) = anchor {
        request = request.with_anchor(anchor);
    }

    let engine = Engine::new(Arc::new(PassthroughCatalog));
    let results = engine.run(&mut graph, request).await?;

    info!(batches = results.len(), "flow finished");
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn anchor_from_args(args: &CliArgs) -> Option<Anchor> {
    match (&args.start, &args.stop) {
        (Some(start), _) => Some(Anchor::Start(start.clone())),
        (None, Some(stop)) => Some(Anchor::Stop(stop.clone())),
        (None, None) => None,
    }
}

/// Dry-run output: vertices with their kinds, then the scheduled layers.
fn print_dry_run(graph: &mut Graph, anchor: &Anchor) -> Result<()> {
    println!("flowdag dry-run");
    println!(
        "  engine.input_field = {}",
        graph.config().engine.input_field
    );
    println!(
        "  engine.max_reactivations = {}",
        graph.config().engine.max_reactivations
    );
    println!();

    println!("vertices ({}):", graph.vertices().len());
    for vertex in graph.vertices() {
        println!("  - {} [{}]", vertex.id, vertex.kind);
        if vertex.display_name != vertex.id {
            println!("      display_name: {}", vertex.display_name);
        }
        let preds = graph.predecessors(&vertex.id);
        if !preds.is_empty() {
            println!("      after: {preds:?}");
        }
        if vertex.frozen {
            println!("      frozen: true");
        }
        if vertex.streaming {
            println!("      streaming: true");
        }
    }
    println!();

    graph.sort_vertices(anchor)?;
    println!("layers:");
    for (i, layer) in graph.sorted_layers().iter().enumerate() {
        println!("  {i}: {layer:?}");
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
