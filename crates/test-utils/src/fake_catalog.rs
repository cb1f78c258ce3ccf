use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use flowdag::exec::{BuildContext, BuildFuture, ComponentCatalog};
use serde_json::{Value, json};

/// What a scripted vertex does when built.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Return the `input_value` parameter (or null).
    Echo,
    /// Return `"<tag>(<input_value>)"`.
    Tag(String),
    Constant(Value),
    Fail(String),
    /// Return the named state entry (or null).
    ReadState(String),
    /// Write a state entry, then return the written value. Appends always
    /// notify.
    WriteState {
        name: String,
        value: Value,
        append: bool,
        notify: bool,
    },
    /// Sleep, then behave as the inner behaviour.
    Sleep(Duration, Box<Behaviour>),
    /// Skip everything downstream, then behave as the inner behaviour.
    Prune(Box<Behaviour>),
}

/// One recorded call to `build`.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub vertex_id: String,
    pub run_id: String,
    pub params: BTreeMap<String, Value>,
    pub session_id: Option<String>,
}

/// A fake catalog that:
/// - records which vertices were built, and with what
/// - behaves per vertex as scripted (default: [`Behaviour::Echo`]).
#[derive(Debug, Clone)]
pub struct ScriptedCatalog {
    behaviours: Arc<HashMap<String, Behaviour>>,
    started: Arc<Mutex<Vec<BuildRecord>>>,
    finished: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self {
            behaviours: Arc::new(HashMap::new()),
            started: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with(mut self, vertex_id: &str, behaviour: Behaviour) -> Self {
        Arc::make_mut(&mut self.behaviours).insert(vertex_id.to_string(), behaviour);
        self
    }

    /// Vertex ids in the order their builds started.
    pub fn builds(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.vertex_id).collect()
    }

    pub fn records(&self) -> Vec<BuildRecord> {
        self.started.lock().unwrap().clone()
    }

    pub fn build_count(&self, vertex_id: &str) -> usize {
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.vertex_id == vertex_id)
            .count()
    }

    /// Vertex ids whose builds ran to the end (including failures).
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl ComponentCatalog for ScriptedCatalog {
    fn build(&self, mut ctx: BuildContext) -> BuildFuture {
        self.started.lock().unwrap().push(BuildRecord {
            vertex_id: ctx.vertex_id.clone(),
            run_id: ctx.run_id.clone(),
            params: ctx.params.clone(),
            session_id: ctx.session_id.clone(),
        });

        let mut behaviour = self
            .behaviours
            .get(&ctx.vertex_id)
            .cloned()
            .unwrap_or(Behaviour::Echo);
        let finished = Arc::clone(&self.finished);

        Box::pin(async move {
            let behaviour = loop {
                match behaviour {
                    Behaviour::Sleep(delay, inner) => {
                        tokio::time::sleep(delay).await;
                        behaviour = *inner;
                    }
                    Behaviour::Prune(inner) => {
                        ctx.prune_successors();
                        behaviour = *inner;
                    }
                    other => break other,
                }
            };

            finished.lock().unwrap().push(ctx.vertex_id.clone());
            let result = apply(&behaviour, &mut ctx)?;
            Ok(ctx.finish(result))
        })
    }
}

fn apply(behaviour: &Behaviour, ctx: &mut BuildContext) -> anyhow::Result<Value> {
    let input = ctx.param("input_value").cloned().unwrap_or(Value::Null);
    let value = match behaviour {
        Behaviour::Echo => input,
        Behaviour::Tag(tag) => {
            let inner = match input {
                Value::String(s) => s,
                other => other.to_string(),
            };
            json!(format!("{tag}({inner})"))
        }
        Behaviour::Constant(value) => value.clone(),
        Behaviour::Fail(message) => bail!("{message}"),
        Behaviour::ReadState(name) => ctx.get_state(name).cloned().unwrap_or(Value::Null),
        Behaviour::WriteState {
            name,
            value,
            append,
            notify,
        } => {
            match (*append, *notify) {
                (true, _) => ctx.append_state(name.clone(), value.clone()),
                (false, true) => ctx.update_state(name.clone(), value.clone()),
                (false, false) => ctx.set_state_local(name.clone(), value.clone()),
            }
            value.clone()
        }
        Behaviour::Sleep(..) | Behaviour::Prune(..) => Value::Null,
    };
    Ok(value)
}
