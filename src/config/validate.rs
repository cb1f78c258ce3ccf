// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::dag::VertexKind;
use crate::errors::{FlowdagError, Result};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = FlowdagError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_engine_section(&raw)?;
        let kinds = parse_kind_overrides(&raw.kinds)?;
        Ok(EngineConfig::new_unchecked(raw.engine, raw.build_times, kinds))
    }
}

fn validate_engine_section(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.engine.input_field.trim().is_empty() {
        return Err(FlowdagError::ConfigError(
            "[engine].input_field must not be empty".to_string(),
        ));
    }

    if cfg.engine.max_reactivations == 0 {
        return Err(FlowdagError::ConfigError(
            "[engine].max_reactivations must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn parse_kind_overrides(raw: &BTreeMap<String, String>) -> Result<BTreeMap<String, VertexKind>> {
    let mut kinds = BTreeMap::new();
    for (type_name, kind_name) in raw.iter() {
        let kind = kind_name.parse::<VertexKind>().map_err(|e| {
            FlowdagError::ConfigError(format!("[kinds].\"{type_name}\": {e}"))
        })?;
        kinds.insert(type_name.clone(), kind);
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_reactivations() {
        let mut raw = RawEngineConfig::default();
        raw.engine.max_reactivations = 0;

        match EngineConfig::try_from(raw) {
            Err(FlowdagError::ConfigError(msg)) => assert!(msg.contains("max_reactivations")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kind_names() {
        let mut raw = RawEngineConfig::default();
        raw.kinds.insert("Foo".to_string(), "spaceship".to_string());

        match EngineConfig::try_from(raw) {
            Err(FlowdagError::ConfigError(msg)) => {
                assert!(msg.contains("Foo"));
                assert!(msg.contains("spaceship"));
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn parses_kind_overrides() {
        let mut raw = RawEngineConfig::default();
        raw.kinds.insert("MyLocalModel".to_string(), "model".to_string());

        let cfg = EngineConfig::try_from(raw).unwrap();
        assert_eq!(cfg.kinds.get("MyLocalModel"), Some(&VertexKind::Model));
    }
}
