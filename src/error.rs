//! Error types for the readers and codecs.
//!
//! The engine itself (inference, join, drift, diff) is total and never
//! returns these; they come from the edges that touch files and foreign
//! formats.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON ({path}): {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failure annotated with the JSON path that broke.
    #[error("invalid schema state: {0}")]
    StatePath(String),

    /// Well-formed JSON whose counts or unions break the type model.
    #[error("invalid schema state: {0}")]
    InvalidState(String),

    #[error("unsupported schema state version: {0}")]
    UnsupportedStateVersion(u64),

    #[error("invalid JSON Schema: {0}")]
    InvalidJsonSchema(String),

    #[error("jq filter failed: {0}")]
    Jq(String),

    #[error("invalid input pattern: {0}")]
    Glob(String),

    #[error("no JSON samples found in {0}")]
    NoSamples(String),

    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json { path: path.into(), source }
    }
}
