//! Error taxonomy for the particle field
//!
//! Initialization errors never escape the scheduler: it logs them and stays
//! idle. Config errors only surface in the CLI; the web host falls back to
//! defaults.

use std::fmt;
use thiserror::Error;

/// Shader stage, used to tag compile failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure while bringing up the render pipeline
#[derive(Debug, Error)]
pub enum InitError {
    #[error("graphics backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("display surface unavailable: {0}")]
    Surface(String),

    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("shading program failed to link: {0}")]
    ProgramLink(String),

    #[error("failed to allocate {0} buffer")]
    BufferAllocation(&'static str),
}

/// Failure while loading a [`FieldConfig`](crate::config::FieldConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid field config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}
