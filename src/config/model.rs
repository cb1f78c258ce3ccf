// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::VertexKind;
use crate::types::InputType;

/// Engine configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// input_field = "input_value"
/// default_input_type = "chat"
/// max_reactivations = 8
///
/// [build_times]
/// "OpenAIModel-x1" = 850
///
/// [kinds]
/// "MyLocalModel" = "model"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSection,

    /// Historical average build time hints in milliseconds, keyed by vertex id.
    #[serde(default)]
    pub build_times: BTreeMap<String, u64>,

    /// Extra type-name to vertex-kind mappings (values are kind names).
    #[serde(default)]
    pub kinds: BTreeMap<String, String>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Field of input vertices that receives the run input.
    #[serde(default = "default_input_field")]
    pub input_field: String,

    /// Input type used for batches that do not name one.
    #[serde(default)]
    pub default_input_type: InputType,

    /// How many times a single vertex may be re-armed by state changes
    /// within one run.
    #[serde(default = "default_max_reactivations")]
    pub max_reactivations: usize,
}

fn default_input_field() -> String {
    "input_value".to_string()
}

fn default_max_reactivations() -> usize {
    8
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            input_field: default_input_field(),
            default_input_type: InputType::default(),
            max_reactivations: default_max_reactivations(),
        }
    }
}

/// Validated engine configuration.
///
/// Only obtainable through `TryFrom<RawEngineConfig>` (or `Default`), so the
/// rest of the crate can assume its invariants hold.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub build_times: BTreeMap<String, u64>,
    pub kinds: BTreeMap<String, VertexKind>,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(
        engine: EngineSection,
        build_times: BTreeMap<String, u64>,
        kinds: BTreeMap<String, VertexKind>,
    ) -> Self {
        Self {
            engine,
            build_times,
            kinds,
        }
    }

    /// Build time hint for a vertex, if one is configured.
    pub fn build_time_hint(&self, vertex_id: &str) -> Option<Duration> {
        self.build_times
            .get(vertex_id)
            .map(|ms| Duration::from_millis(*ms))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new_unchecked(EngineSection::default(), BTreeMap::new(), BTreeMap::new())
    }
}
