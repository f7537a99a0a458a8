use std::path::PathBuf;

use thiserror::Error;

use crate::state::ChunkKey;

#[derive(Error, Debug)]
pub enum TeaError {
    #[error("Malformed chunk filename '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error(
        "Duplicate chunk {key} at iteration {iteration}: '{first}' and '{second}' claim the same chunk"
    )]
    DuplicateChunk {
        iteration: usize,
        key: ChunkKey,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("No prior chunk available for chunk {key} at iteration {iteration}")]
    NoPriorChunkAvailable { iteration: usize, key: ChunkKey },

    #[error("Inconsistent chunk geometry at iteration {iteration} (chunks {keys:?}): {message}")]
    InconsistentChunkGeometry {
        iteration: usize,
        keys: Vec<ChunkKey>,
        message: String,
    },

    #[error(
        "Shape mismatch at iteration {iteration}: field '{field}' holds {actual} cells, coordinates imply {expected}"
    )]
    ShapeMismatch {
        iteration: usize,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Incompatible grids at iteration {iteration}: {message}")]
    IncompatibleGrids { iteration: usize, message: String },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Malformed solver log record '{token}': {reason}")]
    MalformedLog { token: String, reason: String },

    #[error("Codec error in '{path}': {message}")]
    Codec { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TeaError {
    /// Iteration the error is scoped to, if any.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            TeaError::DuplicateChunk { iteration, .. }
            | TeaError::NoPriorChunkAvailable { iteration, .. }
            | TeaError::InconsistentChunkGeometry { iteration, .. }
            | TeaError::ShapeMismatch { iteration, .. }
            | TeaError::IncompatibleGrids { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }

    pub fn codec(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TeaError::Codec {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type TeaResult<T> = Result<T, TeaError>;
