use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical vertex identifier type used throughout the engine.
pub type VertexId = String;

/// Build state of a single vertex.
///
/// - `Unbuilt`: never built, or invalidated by a graph update / new run.
/// - `Building`: dispatched in the current wave.
/// - `Built`: a result is present.
/// - `Errored`: the last build attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    Unbuilt,
    Building,
    Built,
    Errored,
}

/// Which input vertices a run batch is routed to.
///
/// Anything other than `Any` is matched as a substring of the lowercased
/// vertex id (e.g. `chat` matches `ChatInput-x1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Chat,
    Text,
    Any,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Chat => "chat",
            InputType::Text => "text",
            InputType::Any => "any",
        }
    }

    /// Whether a vertex with this id should receive inputs of this type.
    pub fn accepts(&self, vertex_id: &str) -> bool {
        match self {
            InputType::Any => true,
            other => vertex_id.to_lowercase().contains(other.as_str()),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(InputType::Chat),
            "text" => Ok(InputType::Text),
            "any" => Ok(InputType::Any),
            other => Err(format!(
                "invalid input type: {other} (expected \"chat\", \"text\" or \"any\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_type_matches_lowercased_id() {
        assert!(InputType::Chat.accepts("ChatInput-abc"));
        assert!(!InputType::Chat.accepts("TextInput-abc"));
        assert!(InputType::Any.accepts("Whatever-1"));
        assert_eq!("TEXT".parse::<InputType>(), Ok(InputType::Text));
        assert!("voice".parse::<InputType>().is_err());
    }
}
