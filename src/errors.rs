// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Structural and validation errors are raised while a [`Graph`] is being
//! constructed and are never retried. Build failures carry the failing
//! vertex so the caller can tell the user which component broke.
//!
//! [`Graph`]: crate::dag::Graph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Vertex {0} not found")]
    VertexNotFound(String),

    #[error(
        "Components {first} and {second} are connected and both have stream or streaming set to true"
    )]
    StreamConflict { first: String, second: String },

    #[error("Cycle detected in graph: {0}")]
    DagCycle(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Error building vertex {display_name} ({vertex}): {message}")]
    BuildFailed {
        vertex: String,
        display_name: String,
        message: String,
    },

    #[error("Run ID not set")]
    RunIdNotSet,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowdagError {
    /// Id of the vertex a build failure belongs to, if this is one.
    pub fn failed_vertex(&self) -> Option<&str> {
        match self {
            FlowdagError::BuildFailed { vertex, .. } => Some(vertex),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowdagError>;
